// export.rs - Image I/O for the headless renderer

use glass_rain::render::OpticalMap;
use glass_rain::scene::{Background, Frame};
use image::RgbaImage;
use std::error::Error;
use std::path::Path;

/// Decode any image the `image` crate understands into a background.
pub fn load_background(path: &Path) -> Result<Background, Box<dyn Error>> {
    let img = image::open(path)?.to_rgba8();
    let (w, h) = img.dimensions();
    log::info!("Background {} ({}x{})", path.display(), w, h);
    Ok(Background::from_rgba(w, h, img.into_raw())?)
}

pub fn write_frame(frame: &Frame, path: &Path) -> Result<(), Box<dyn Error>> {
    save(frame.width(), frame.height(), frame.pixels().to_vec(), path)
}

/// Optical map channels as RGBA; mask lands in alpha.
pub fn write_map(map: &OpticalMap, path: &Path) -> Result<(), Box<dyn Error>> {
    save(map.width(), map.height(), map.to_rgba8(), path)
}

fn save(width: usize, height: usize, pixels: Vec<u8>, path: &Path) -> Result<(), Box<dyn Error>> {
    let img = RgbaImage::from_raw(width as u32, height as u32, pixels)
        .ok_or("pixel buffer does not match image size")?;
    img.save(path)?;
    Ok(())
}
