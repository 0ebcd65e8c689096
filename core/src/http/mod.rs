//! The HTTP data model: methods, headers, media types, bodies, and the
//! request/response pair the rest of the pipeline operates on.

mod body;
mod headers;
mod media_type;
mod method;
mod path;
mod request;
mod response;

pub use body::{BodyChunk, BodyError, BodyStream, HttpBody};
pub use headers::{HeaderValue, Headers};
pub use media_type::{MediaType, MediaTypeError, Tree, TopLevelType};
pub use method::{Method, UnknownMethod};
pub use path::{parse_query, split_path_and_query, split_segments};
pub use request::{HttpRequest, HttpVersion, Path, Query};
pub use response::{HttpResponse, StatusCode};
