// Spreadsheet values API: operations, request construction, the transport port,
// and the service that ties authentication and requests together.

pub mod request_builder;
pub mod retry_policy;
pub mod sheets_models;
pub mod sheets_service;
pub mod sheets_transport;

pub use request_builder::{encode_component, SheetsRequestBuilder, DEFAULT_SHEETS_BASE_URL};
pub use retry_policy::RetryPolicy;
pub use sheets_models::{
    rows, CellValue, HttpMethod, HttpRequestDescriptor, RangeUpdate, Rows, SheetsOperation,
    ValueInputOption,
};
pub use sheets_service::SheetsService;
pub use sheets_transport::{HttpResponse, SheetsTransport};
