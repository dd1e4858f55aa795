use super::CaptureSource;
use crate::error::CompositeError;
use image::{imageops, RgbImage};
use std::io::{BufRead, StdinLock};
use std::path::PathBuf;

/// What the person at the camera asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Take the photo now
    Confirm,
    /// Abandon the capture
    Cancel,
    /// Keep previewing
    Wait,
}

/// Source of confirm/cancel signals during capture
pub trait ControlInput {
    /// Block until the next signal arrives
    fn next_signal(&mut self) -> Result<Signal, CompositeError>;
}

/// Line-oriented control: Enter (or "s"/"space") confirms, "q"/"esc"
/// cancels, end of input cancels, anything else keeps previewing.
pub struct LineControl<R> {
    reader: R,
}

impl LineControl<StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock())
    }
}

impl<R: BufRead> LineControl<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    fn parse(line: &str) -> Signal {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "s" | "space" => Signal::Confirm,
            "q" | "esc" | "quit" => Signal::Cancel,
            _ => Signal::Wait,
        }
    }
}

impl<R: BufRead> ControlInput for LineControl<R> {
    fn next_signal(&mut self) -> Result<Signal, CompositeError> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|source| CompositeError::Io {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        if read == 0 {
            return Ok(Signal::Cancel);
        }
        Ok(Self::parse(&line))
    }
}

/// Result of an interactive capture
#[derive(Debug)]
pub enum Shot {
    Frame(RgbImage),
    Cancelled,
}

/// Preview loop over a capture source, finished by a control signal
pub struct InteractiveCapture<S, C> {
    source: S,
    control: C,
    mirror: bool,
}

impl<S: CaptureSource, C: ControlInput> InteractiveCapture<S, C> {
    /// Frames are mirrored by default so the photo matches a selfie preview
    pub fn new(source: S, control: C) -> Self {
        Self {
            source,
            control,
            mirror: true,
        }
    }

    pub fn mirrored(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Block until the user confirms or cancels.
    ///
    /// The stream is read on every round so the camera keeps delivering;
    /// on confirm one more frame is taken so the photo is the latest one.
    pub fn acquire(&mut self) -> Result<Shot, CompositeError> {
        let (width, height) = self.source.resolution();
        tracing::info!("Camera ready ({}x{})", width, height);
        tracing::info!("Press Enter to take the photo, q then Enter to cancel");

        loop {
            self.pull()?;
            match self.control.next_signal()? {
                Signal::Wait => continue,
                Signal::Cancel => {
                    tracing::info!("Cancelled by user");
                    return Ok(Shot::Cancelled);
                }
                Signal::Confirm => {
                    let frame = self.pull()?;
                    tracing::info!("Photo captured ({}x{})", frame.width(), frame.height());
                    let frame = if self.mirror {
                        imageops::flip_horizontal(&frame)
                    } else {
                        frame
                    };
                    return Ok(Shot::Frame(frame));
                }
            }
        }
    }

    fn pull(&mut self) -> Result<RgbImage, CompositeError> {
        let frame = self
            .source
            .capture_frame()
            .map_err(|e| CompositeError::Device(format!("{e:#}")))?;
        if frame.width() == 0 || frame.height() == 0 {
            return Err(CompositeError::Device("camera returned an empty frame".to_string()));
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use image::Rgb;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Each frame encodes its sequence number in the left pixel.
    struct CountingSource {
        taken: u8,
        fail_after: Option<u8>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                taken: 0,
                fail_after: None,
            }
        }
    }

    impl CaptureSource for CountingSource {
        fn capture_frame(&mut self) -> Result<RgbImage> {
            if self.fail_after == Some(self.taken) {
                return Err(anyhow!("device unplugged"));
            }
            self.taken += 1;
            let mut frame = RgbImage::from_pixel(2, 1, Rgb([0, 0, 0]));
            frame.put_pixel(0, 0, Rgb([self.taken, 0, 0]));
            Ok(frame)
        }

        fn resolution(&self) -> (u32, u32) {
            (2, 1)
        }
    }

    struct Script(VecDeque<Signal>);

    impl ControlInput for Script {
        fn next_signal(&mut self) -> Result<Signal, CompositeError> {
            Ok(self.0.pop_front().unwrap_or(Signal::Cancel))
        }
    }

    fn script(signals: &[Signal]) -> Script {
        Script(signals.iter().copied().collect())
    }

    #[test]
    fn confirm_returns_a_fresh_frame() {
        let mut capture = InteractiveCapture::new(
            CountingSource::new(),
            script(&[Signal::Wait, Signal::Wait, Signal::Confirm]),
        )
        .mirrored(false);

        match capture.acquire().unwrap() {
            // Three preview frames, then one more on confirm
            Shot::Frame(frame) => assert_eq!(frame.get_pixel(0, 0)[0], 4),
            Shot::Cancelled => panic!("expected a frame"),
        }
    }

    #[test]
    fn mirroring_flips_horizontally() {
        let mut capture = InteractiveCapture::new(CountingSource::new(), script(&[Signal::Confirm]));

        match capture.acquire().unwrap() {
            Shot::Frame(frame) => {
                assert_eq!(frame.get_pixel(0, 0)[0], 0);
                assert_eq!(frame.get_pixel(1, 0)[0], 2);
            }
            Shot::Cancelled => panic!("expected a frame"),
        }
    }

    #[test]
    fn cancel_produces_no_frame() {
        let mut capture =
            InteractiveCapture::new(CountingSource::new(), script(&[Signal::Wait, Signal::Cancel]));
        assert!(matches!(capture.acquire().unwrap(), Shot::Cancelled));
    }

    #[test]
    fn device_failure_is_a_device_error() {
        let source = CountingSource {
            taken: 0,
            fail_after: Some(1),
        };
        let mut capture = InteractiveCapture::new(source, script(&[Signal::Confirm]));
        let err = capture.acquire().unwrap_err();
        assert!(matches!(err, CompositeError::Device(msg) if msg.contains("unplugged")));
    }

    #[test]
    fn line_control_maps_keys() {
        let input = Cursor::new("foo\n\nq\ns\nESC\n");
        let mut control = LineControl::new(input);

        assert_eq!(control.next_signal().unwrap(), Signal::Wait);
        assert_eq!(control.next_signal().unwrap(), Signal::Confirm);
        assert_eq!(control.next_signal().unwrap(), Signal::Cancel);
        assert_eq!(control.next_signal().unwrap(), Signal::Confirm);
        assert_eq!(control.next_signal().unwrap(), Signal::Cancel);
        // End of input
        assert_eq!(control.next_signal().unwrap(), Signal::Cancel);
    }
}
