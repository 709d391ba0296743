//! Ticket QR codes

use std::path::PathBuf;

use qrcode::{render::svg, QrCode};

use crate::{
    error::{AppError, AppResult},
    models::Booking,
};

#[derive(Clone)]
pub struct TicketService {
    qr_dir: PathBuf,
}

impl TicketService {
    pub fn new(qr_dir: PathBuf) -> Self {
        Self { qr_dir }
    }

    /// URL prefix under which the QR directory is served
    pub fn public_prefix(&self) -> String {
        let dir = self.qr_dir.to_string_lossy().replace('\\', "/");
        format!("/{}", dir.trim_start_matches("./").trim_matches('/'))
    }

    /// Write `<qr_dir>/<ticket_id>.svg` and return its public URL
    pub async fn write_qr(&self, booking: &Booking) -> AppResult<String> {
        let code = QrCode::new(booking.qr_payload().as_bytes())
            .map_err(|e| AppError::Internal(format!("Failed to encode QR code: {}", e)))?;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(240, 240)
            .quiet_zone(true)
            .build();

        tokio::fs::create_dir_all(&self.qr_dir).await?;
        let file_name = format!("{}.svg", booking.ticket_id);
        tokio::fs::write(self.qr_dir.join(&file_name), image).await?;

        Ok(format!("{}/{}", self.public_prefix(), file_name))
    }
}
