use super::handler;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let issue = warp::post()
        .and(warp::path("tokens"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(warp::addr::remote())
        .and(with(server.token_service.clone()))
        .and_then(handler::issue_tokens);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(warp::addr::remote())
        .and(with(server.token_service.clone()))
        .and_then(handler::refresh_tokens);

    issue.or(refresh)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
