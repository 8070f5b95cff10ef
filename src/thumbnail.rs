use eframe::egui::ColorImage;

/// Downloads and decodes a video thumbnail into an egui image.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    let resp = match reqwest::blocking::get(url).and_then(|r| r.error_for_status()) {
        Ok(resp) => resp.bytes().ok()?,
        Err(err) => {
            tracing::debug!(%url, error = %err, "thumbnail fetch failed");
            return None;
        }
    };
    let img = image::load_from_memory(&resp).ok()?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}
