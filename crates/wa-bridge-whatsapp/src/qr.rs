//! Terminal rendering of pairing QR codes.

use qrcode::{render::unicode::Dense1x2, QrCode};

use wa_bridge_core::{errors::Error, Result};

/// Render `payload` as a compact unicode QR code (two modules per cell).
pub fn render(payload: &str) -> Result<String> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| Error::External(format!("qr encode failed: {e}")))?;
    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_multiline_block() {
        let out = render("2@AbCdEf,GhIjKl,MnOpQr==").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.len() > 10);
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }
}
