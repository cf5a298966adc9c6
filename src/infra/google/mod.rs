pub mod credentials_loader;
mod http_support;
pub mod sheets_transport;
pub mod token_exchanger;

pub use sheets_transport::ReqwestSheetsTransport;
pub use token_exchanger::{parse_token_response, TokenExchanger, TokenResponse, JWT_BEARER_GRANT};
