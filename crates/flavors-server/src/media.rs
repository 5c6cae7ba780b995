//! Media attachments served back from stored recipes.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl FromStr for MediaKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        })
    }
}

/// Content type from the leading magic bytes.
pub fn guess_content_type(data: &[u8]) -> &'static str {
    match data {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some("audio/wav"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'A', b'V', b'I', b' ', ..] => Some("video/x-msvideo"),
        [_, _, _, _, b'f', b't', b'y', b'p', b'q', b't', ..] => Some("video/quicktime"),
        [_, _, _, _, b'f', b't', b'y', b'p', b'M', b'4', b'A', ..] => Some("audio/mp4"),
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => Some("video/mp4"),
        [0x1A, 0x45, 0xDF, 0xA3, ..] => Some("video/webm"),
        [b'O', b'g', b'g', b'S', ..] => Some("audio/ogg"),
        [b'I', b'D', b'3', ..] | [0xFF, 0xFB, ..] | [0xFF, 0xF3, ..] => Some("audio/mpeg"),
        _ => None,
    }
    .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kinds() {
        assert_eq!("image".parse::<MediaKind>(), Ok(MediaKind::Image));
        assert_eq!("audio".parse::<MediaKind>(), Ok(MediaKind::Audio));
        assert!("thumbnail".parse::<MediaKind>().is_err());
        assert_eq!(MediaKind::Video.to_string(), "video");
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(guess_content_type(b"\x89PNG\r\n\x1a\n"), "image/png");
        assert_eq!(guess_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(guess_content_type(b"RIFF\0\0\0\0WAVEfmt "), "audio/wav");
        assert_eq!(guess_content_type(b"\0\0\0\x18ftypmp42"), "video/mp4");
        assert_eq!(guess_content_type(b"\0\0\0\x14ftypqt  "), "video/quicktime");
        assert_eq!(guess_content_type(b"OggS\0"), "audio/ogg");
        assert_eq!(guess_content_type(b"ID3\x03"), "audio/mpeg");
    }

    #[test]
    fn unknown_bytes_fall_back() {
        assert_eq!(guess_content_type(b"??"), "application/octet-stream");
        assert_eq!(guess_content_type(&[]), "application/octet-stream");
    }
}
