//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Deterministic high-entropy pixels so encoded fixtures stay well above
/// the minimum file size.
pub fn noise_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let mut v = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77) ^ 0x5bd1_e995;
        v ^= v >> 15;
        v = v.wrapping_mul(0x2C1B_3C6D);
        v ^= v >> 12;
        Rgb([(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8])
    })
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    noise_image(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    noise_image(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

pub fn write_webp(path: &Path, width: u32, height: u32) {
    noise_image(width, height)
        .save_with_format(path, ImageFormat::WebP)
        .unwrap();
}

/// Fully black PNG. Large enough that the compressed file clears the
/// minimum size check.
pub fn write_black_png(path: &Path) {
    RgbImage::new(512, 512)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

/// Valid JPEG with its end-of-image marker cut off.
pub fn write_truncated_jpeg(path: &Path) {
    write_jpeg(path, 64, 64);
    let bytes = fs::read(path).unwrap();
    fs::write(path, &bytes[..bytes.len() - 2]).unwrap();
}

pub fn write_bytes(path: &Path, content: &[u8]) {
    let mut file = File::create(path).unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
}

/// Plain text long enough to pass the size check.
pub fn write_text(path: &Path) {
    write_bytes(path, "this is definitely not an image\n".repeat(8).as_bytes());
}

/// Directory tree with a known mix of images.
///
/// Returns the directory, the number of image candidates and the number
/// of corrupt images among them.
pub fn mixed_fixture() -> (TempDir, usize, usize) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let nested = root.join("assets").join("ships");
    fs::create_dir_all(&nested).unwrap();

    // Valid
    for i in 0..4 {
        write_png(&root.join(format!("tile_{}.png", i)), 64, 64);
    }
    write_png(&nested.join("hull.PNG"), 120, 80);
    write_jpeg(&root.join("photo.jpg"), 64, 64);
    write_jpeg(&nested.join("cockpit.jpeg"), 200, 150);
    write_webp(&nested.join("icon.webp"), 32, 32);

    // Corrupt
    File::create(root.join("empty.png")).unwrap();
    write_bytes(&root.join("stub.jpg"), &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
    write_text(&root.join("renamed.png"));
    write_truncated_jpeg(&nested.join("cut.jpg"));
    write_black_png(&nested.join("black.png"));
    write_bytes(&root.join("garbage.bmp"), &[0x42; 300]);
    let mut fake_webp = b"RIFF\x00\x01\x00\x00WAVEfmt ".to_vec();
    fake_webp.resize(200, 0x11);
    write_bytes(&nested.join("fake.webp"), &fake_webp);

    // Not candidates
    write_text(&root.join("notes.txt"));
    write_text(&nested.join("manifest.json"));

    (temp_dir, 15, 7)
}
