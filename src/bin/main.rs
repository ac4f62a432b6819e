#[cfg(not(target_arch = "wasm32"))]
mod native {
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use spin_sdk::http::{Method, Request};

    fn to_component_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            _ => Method::Get,
        };

        let uri = req.uri().to_string();
        let mut builder = Request::builder();
        builder.method(method).uri(&uri);
        for (name, value) in req.headers() {
            if let Ok(v) = value.to_str() {
                builder.header(name.as_str(), v);
            }
        }
        builder.body(body.to_vec()).build()
    }

    fn to_http_response(resp: spin_sdk::http::Response) -> HttpResponse {
        let status = *resp.status();
        let mut builder = HttpResponse::build(
            actix_web::http::StatusCode::from_u16(status)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
        );
        builder.body(resp.body().to_vec())
    }

    async fn handle_all(req: HttpRequest, body: web::Bytes) -> HttpResponse {
        let component_req = to_component_request(&req, body);
        match stargaze::route(component_req) {
            Ok(resp) => to_http_response(resp),
            Err(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "message": "Internal server error",
            })),
        }
    }

    pub async fn run() -> std::io::Result<()> {
        let port = stargaze::config::listen_port();
        println!("Stargaze API listening on http://0.0.0.0:{}", port);

        HttpServer::new(|| App::new().default_service(web::route().to(handle_all)))
            .bind(("0.0.0.0", port))?
            .run()
            .await
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
