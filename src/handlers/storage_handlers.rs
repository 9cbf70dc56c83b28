use actix_files::NamedFile;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{web, HttpRequest, HttpResponse, mime::Mime};

use crate::backend::LocalObjectStore;
use crate::errors::AppError;

/// Stored objects share the app's origin, so they are never allowed to run
/// script or be sniffed into another type.
const OBJECT_CSP: &str = "sandbox; default-src 'none'";

/// Serve a stored object with the content type recorded at upload time.
pub async fn serve(
    req: HttpRequest,
    store: web::Data<LocalObjectStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (bucket, object) = path.into_inner();
    let file_path = store.resolve(&bucket, &object).ok_or(AppError::NotFound)?;

    let mut file = NamedFile::open_async(&file_path)
        .await
        .map_err(|_| AppError::NotFound)?;
    if let Some(mime) = store
        .content_type(&bucket, &object)
        .await
        .and_then(|ct| ct.parse::<Mime>().ok())
    {
        file = file.set_content_type(mime);
    }
    let mut resp = file.into_response(&req);
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(OBJECT_CSP));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    Ok(resp)
}
