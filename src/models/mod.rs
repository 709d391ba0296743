//! Data models for PixelPast

pub mod account;
pub mod booking;
pub mod museum;
pub mod pagination;

// Re-export commonly used types
pub use account::{AdminAccount, Passkey, Role, SessionClaims, VisitorAccount, VisitorProfile};
pub use booking::{AttendanceStatus, Booking, NewBooking, RatingRecord};
pub use museum::{CreateMuseum, Museum, MuseumUpdate};
pub use pagination::{Listing, Page, PageQuery, Pagination};
