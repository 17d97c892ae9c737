//! Content type detection
//!
//! The type stored with an object comes from its bytes, not from the header
//! the client sent. Only the first 512 bytes are inspected.

const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Byte signatures, checked in order
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"\x89PNG\r\n\x1A\n", "image/png"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"\x1A\x45\xDF\xA3", "video/webm"),
    (b"OggS\x00", "application/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"%!PS-Adobe-", "application/postscript"),
];

/// Detect the content type of `data`, falling back to the file name
pub fn sniff(data: &[u8], file_name: &str) -> String {
    let head = &data[..data.len().min(SNIFF_LEN)];

    if let Some(detected) = sniff_bytes(head) {
        return detected.to_string();
    }

    if let Some(guess) = mime_guess::from_path(file_name).first_raw() {
        return guess.to_string();
    }

    if !head.is_empty() && is_text(head) {
        return TEXT_PLAIN.to_string();
    }

    OCTET_STREAM.to_string()
}

fn sniff_bytes(head: &[u8]) -> Option<&'static str> {
    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| head.starts_with(magic)) {
        return Some(*mime);
    }

    // RIFF containers carry their format at offset 8
    if head.len() >= 12 && head.starts_with(b"RIFF") {
        match &head[8..12] {
            b"WEBP" => return Some("image/webp"),
            b"WAVE" => return Some("audio/wave"),
            b"AVI " => return Some("video/avi"),
            _ => {}
        }
    }

    // ISO base media: box size, then "ftyp"
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return Some("video/mp4");
    }

    let trimmed = trim_leading_whitespace(head);
    let lowered: Vec<u8> = trimmed.iter().take(14).map(u8::to_ascii_lowercase).collect();
    if lowered.starts_with(b"<!doctype html") || lowered.starts_with(b"<html") {
        return Some("text/html; charset=utf-8");
    }
    if lowered.starts_with(b"<?xml") {
        return Some("text/xml; charset=utf-8");
    }

    None
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    &data[start..]
}

/// No control bytes other than common whitespace
fn is_text(data: &[u8]) -> bool {
    data.iter()
        .all(|&b| b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x0C | 0x1B))
}
