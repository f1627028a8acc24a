//! Journaling API client
//!
//! - **http**: `ApiClient`, one method per endpoint
//! - **dto**: request/response bodies and domain records
//! - **error**: `ClientError`

mod dto;
mod error;
mod http;

pub use dto::{
    Availability, CalendarRecord, Diary, DiaryRequest, LoginResponse, PurchaseResponse,
    StatusResponse, Sticker, User,
};
pub use error::{ClientError, ClientResult};
pub use http::{ApiClient, ClientConfig, DEFAULT_API_BASE};
