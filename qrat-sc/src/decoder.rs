//! Decoder adapter
//!
//! The QR decoding engine itself is external. This module defines the event
//! it produces for every frame with a positive decode, plus a line-oriented
//! adapter used by the terminal binary: each non-empty input line is one
//! decoded payload (a hardware scanner in keyboard-wedge mode or a piped
//! decoder process both produce exactly this). Blank lines are frames with no
//! detection and are dropped silently.

use std::time::Instant;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Corner of a detected code, in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One positive decode from one camera frame
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEvent {
    /// Decoded payload, arbitrary text
    pub raw_text: String,
    /// Capture time
    pub timestamp: Instant,
    /// Top-left, top-right, bottom-right, bottom-left when the engine reports geometry
    pub corners: Option<[Point; 4]>,
}

impl ScanEvent {
    /// Event captured now, without geometry
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self::at(raw_text, Instant::now())
    }

    /// Event captured at a given instant
    pub fn at(raw_text: impl Into<String>, timestamp: Instant) -> Self {
        Self {
            raw_text: raw_text.into(),
            timestamp,
            corners: None,
        }
    }

    pub fn with_corners(mut self, corners: [Point; 4]) -> Self {
        self.corners = Some(corners);
        self
    }

    /// Center of the detected code, if geometry is known
    pub fn center(&self) -> Option<Point> {
        self.corners.map(|c| Point {
            x: c.iter().map(|p| p.x).sum::<f64>() / 4.0,
            y: c.iter().map(|p| p.y).sum::<f64>() / 4.0,
        })
    }
}

/// Reads decoded payloads line by line
pub struct LineDecoder<R> {
    lines: Lines<R>,
}

impl<R> LineDecoder<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next positive decode, or `None` at end of input
    pub async fn next_event(&mut self) -> std::io::Result<Option<ScanEvent>> {
        while let Some(line) = self.lines.next_line().await? {
            let payload = line.trim_end_matches('\r');
            if payload.trim().is_empty() {
                tracing::trace!("No detection in frame");
                continue;
            }
            return Ok(Some(ScanEvent::new(payload)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_line_decoder_skips_blank_frames() {
        let input: &[u8] = b"student:1\n\n   \r\n{\"id\": 2}\r\nlast";
        let mut decoder = LineDecoder::new(input);

        let mut payloads = Vec::new();
        while let Some(event) = decoder.next_event().await.unwrap() {
            payloads.push(event.raw_text);
        }

        assert_eq!(payloads, vec!["student:1", "{\"id\": 2}", "last"]);
    }

    #[test]
    fn test_center_of_corners() {
        let event = ScanEvent::new("42").with_corners([
            Point { x: 0.0, y: 0.0 },
            Point { x: 10.0, y: 0.0 },
            Point { x: 10.0, y: 10.0 },
            Point { x: 0.0, y: 10.0 },
        ]);
        assert_eq!(event.center(), Some(Point { x: 5.0, y: 5.0 }));
        assert_eq!(ScanEvent::new("42").center(), None);
    }
}
