//! Landmark sources feeding the frame pipeline.

use crate::{landmarks::FrameLandmarks, Error, Result};
use std::{
    collections::VecDeque,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// Producer of per-frame landmarks
pub trait LandmarkSource {
    /// Block until the next frame's landmarks are available.
    ///
    /// Returns `Ok(None)` when the stream has ended.
    ///
    /// # Errors
    ///
    /// Returns `Error::Acquisition` when the underlying stream fails. Errors
    /// that are not [`Error::is_fatal`] make the pipeline drop only the
    /// current frame.
    fn next_frame(&mut self) -> Result<Option<FrameLandmarks>>;
}

impl<T: LandmarkSource + ?Sized> LandmarkSource for Box<T> {
    fn next_frame(&mut self) -> Result<Option<FrameLandmarks>> {
        (**self).next_frame()
    }
}

/// Reads one JSON-encoded [`FrameLandmarks`] per line.
///
/// Reads block without a time limit. While a live producer (such as a
/// tracker piped into stdin) is silent the skeleton stays at its last
/// applied pose; held values are re-applied when the next frame arrives.
/// Readers that need a bound should apply their own read timeout and report
/// it as an error.
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_number: usize,
    normalized_depth_scale: Option<f64>,
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a JSON-lines recording
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::Acquisition(format!("Cannot open {}: {e}", path.display())))?;
        log::info!("Reading landmarks from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            normalized_depth_scale: None,
        }
    }

    /// Treat coordinates as image fractions and convert them to pixels,
    /// scaling depth by `depth_scale`
    #[must_use]
    pub fn normalized(mut self, depth_scale: f64) -> Self {
        self.normalized_depth_scale = Some(depth_scale);
        self
    }

    /// Number of lines consumed so far
    #[must_use]
    pub const fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<FrameLandmarks>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .map_err(|e| Error::Acquisition(format!("Read failed after line {}: {e}", self.line_number)))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let frame: FrameLandmarks = serde_json::from_str(trimmed)
                .map_err(|e| Error::Acquisition(format!("Malformed frame on line {}: {e}", self.line_number)))?;

            return Ok(Some(match self.normalized_depth_scale {
                Some(depth_scale) => frame.into_pixels(depth_scale),
                None => frame,
            }));
        }
    }
}

/// In-memory queue of frames
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    frames: VecDeque<FrameLandmarks>,
}

impl FrameQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: FrameLandmarks) {
        self.frames.push_back(frame);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FromIterator<FrameLandmarks> for FrameQueue {
    fn from_iter<T: IntoIterator<Item = FrameLandmarks>>(iter: T) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl LandmarkSource for FrameQueue {
    fn next_frame(&mut self) -> Result<Option<FrameLandmarks>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_json_lines_skips_blank_lines() {
        let input = "{\"width\": 640, \"height\": 480}\n\n   \n{\"width\": 320, \"height\": 240}\n";
        let mut source = JsonLinesSource::new(Cursor::new(input));
        assert_eq!(source.next_frame().unwrap().unwrap().width, 640);
        assert_eq!(source.next_frame().unwrap().unwrap().width, 320);
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.line_number(), 4);
    }

    #[test]
    fn test_malformed_line_is_acquisition_error() {
        let mut source = JsonLinesSource::new(Cursor::new("{\"width\": 640, \"height\": 480}\nnot json\n"));
        assert!(source.next_frame().is_ok());
        let err = source.next_frame().unwrap_err();
        assert!(matches!(err, Error::Acquisition(ref msg) if msg.contains("line 2")));
    }

    #[test]
    fn test_normalized_input() {
        let input = r#"{"width": 640, "height": 480, "face": {"1": {"x": 0.5, "y": 0.5, "z": -0.01}}}"#;
        let mut source = JsonLinesSource::new(Cursor::new(input)).normalized(3000.0);
        let frame = source.next_frame().unwrap().unwrap();
        let nose = *frame.face.unwrap().get(1).unwrap();
        assert_eq!(nose.x, 320.0);
        assert_eq!(nose.y, 240.0);
        assert!((nose.depth() + 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_queue_order() {
        let mut queue: FrameQueue = [FrameLandmarks::empty(1, 1), FrameLandmarks::empty(2, 2)].into_iter().collect();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.next_frame().unwrap().unwrap().width, 1);
        assert_eq!(queue.next_frame().unwrap().unwrap().width, 2);
        assert!(queue.next_frame().unwrap().is_none());
    }
}
