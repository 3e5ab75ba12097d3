//! The request/response pair route handlers work on.

use crate::parser::HttpRequest;
use crate::router::Request;
use crate::server::response::HttpResponse;

/// A parsed request together with the response being built for it.
///
/// The server creates one per request with a `200 OK` empty response and
/// writes out whatever the matched handler leaves in `response`.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

impl Exchange {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            response: HttpResponse::default(),
        }
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}

impl Request for Exchange {
    fn method(&self) -> &str {
        self.request.method.as_str()
    }

    fn uri(&self) -> &str {
        &self.request.path
    }
}
