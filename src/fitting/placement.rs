use crate::error::CompositeError;

/// Where a layer lands on a background: top-left offset plus extent.
///
/// Offsets are unsigned, so a placement that would start left of or above
/// the background cannot be represented; the far edges are checked by
/// [`Placement::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Cover the whole of a `(width, height)` canvas.
    pub fn full((width, height): (u32, u32)) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Centre `layer` on `background`, flooring odd differences.
    pub fn centered(
        (width, height): (u32, u32),
        (bg_width, bg_height): (u32, u32),
    ) -> Result<Self, CompositeError> {
        if width > bg_width || height > bg_height {
            return Err(CompositeError::Dimension(format!(
                "{width}x{height} layer does not fit on {bg_width}x{bg_height} background"
            )));
        }
        Ok(Self {
            x: (bg_width - width) / 2,
            y: (bg_height - height) / 2,
            width,
            height,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Check the placement lies inside a `(width, height)` background.
    pub fn validate(self, (bg_width, bg_height): (u32, u32)) -> Result<Self, CompositeError> {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        match (right, bottom) {
            (Some(right), Some(bottom)) if right <= bg_width && bottom <= bg_height => Ok(self),
            _ => Err(CompositeError::Dimension(format!(
                "placement {}x{} at ({}, {}) exceeds {}x{} background",
                self.width, self.height, self.x, self.y, bg_width, bg_height
            ))),
        }
    }

    /// Grow by `border` pixels on every side.
    pub fn expand(self, border: u32) -> Result<Self, CompositeError> {
        let grown = (
            self.x.checked_sub(border),
            self.y.checked_sub(border),
            border
                .checked_mul(2)
                .and_then(|b| self.width.checked_add(b)),
            border
                .checked_mul(2)
                .and_then(|b| self.height.checked_add(b)),
        );
        match grown {
            (Some(x), Some(y), Some(width), Some(height)) => Ok(Self {
                x,
                y,
                width,
                height,
            }),
            _ => Err(CompositeError::Dimension(format!(
                "a {border}px border around {}x{} at ({}, {}) leaves the background",
                self.width, self.height, self.x, self.y
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_floors_odd_differences() {
        let placement = Placement::centered((266, 266), (1000, 800)).unwrap();
        assert_eq!((placement.x, placement.y), (367, 267));

        let placement = Placement::centered((2, 3), (5, 6)).unwrap();
        assert_eq!((placement.x, placement.y), (1, 1));
    }

    #[test]
    fn centered_equal_sizes_sits_at_origin() {
        assert_eq!(
            Placement::centered((64, 48), (64, 48)).unwrap(),
            Placement::full((64, 48))
        );
    }

    #[test]
    fn centered_rejects_oversized_layers() {
        assert!(matches!(
            Placement::centered((101, 10), (100, 100)),
            Err(CompositeError::Dimension(_))
        ));
    }

    #[test]
    fn validate_checks_far_edges() {
        let inside = Placement {
            x: 10,
            y: 10,
            width: 90,
            height: 40,
        };
        assert!(inside.validate((100, 50)).is_ok());
        assert!(inside.validate((99, 50)).is_err());
        assert!(inside.validate((100, 49)).is_err());

        let overflowing = Placement {
            x: u32::MAX,
            y: 0,
            width: 2,
            height: 1,
        };
        assert!(overflowing.validate((u32::MAX, 1)).is_err());
    }

    #[test]
    fn expand_grows_every_side() {
        let placement = Placement::centered((40, 20), (200, 100)).unwrap();
        let grown = placement.expand(30).unwrap();

        assert_eq!(grown, Placement::centered((100, 80), (200, 100)).unwrap());
        assert!(placement.expand(41).is_err());
    }
}
