//! Handler composition.
//!
//! A [`Handler`] turns a request into a response; a [`Middleware`] turns one
//! handler into another. Chains are assembled with [`compose`], where the
//! first middleware listed is the outermost: it sees the request first and
//! the response last.
//!
//! Handlers are `Rc`-based and built per worker, so they never cross threads.

use std::future::Future;
use std::rc::Rc;

use actix_web::{
    dev::{fn_service, ServiceRequest, ServiceResponse},
    web,
};
use futures_util::future::LocalBoxFuture;

pub type Handler = Rc<dyn Fn(ServiceRequest) -> LocalBoxFuture<'static, ServiceResponse>>;

pub type Middleware = Rc<dyn Fn(Handler) -> Handler>;

pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(ServiceRequest) -> Fut + 'static,
    Fut: Future<Output = ServiceResponse> + 'static,
{
    Rc::new(move |req: ServiceRequest| -> LocalBoxFuture<'static, ServiceResponse> {
        Box::pin(f(req))
    })
}

/// Builds a middleware from an `async fn(req, next)`. The function decides
/// whether to call `next` or answer on its own.
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(ServiceRequest, Handler) -> Fut + 'static,
    Fut: Future<Output = ServiceResponse> + 'static,
{
    let f = Rc::new(f);
    Rc::new(move |next: Handler| -> Handler {
        let f = Rc::clone(&f);
        Rc::new(move |req: ServiceRequest| -> LocalBoxFuture<'static, ServiceResponse> {
            Box::pin(f(req, Rc::clone(&next)))
        })
    })
}

/// `compose(h, [a, b, c])` is `a(b(c(h)))`.
pub fn compose(terminal: Handler, middlewares: &[Middleware]) -> Handler {
    middlewares
        .iter()
        .rev()
        .fold(terminal, |next, middleware| middleware(next))
}

/// Serves `handler` for every method on `path`.
pub fn mount(cfg: &mut web::ServiceConfig, path: &str, handler: Handler) {
    cfg.service(
        web::resource(path).default_service(fn_service(move |req: ServiceRequest| {
            let handler = Rc::clone(&handler);
            async move { Ok::<_, actix_web::Error>(handler(req).await) }
        })),
    );
}
