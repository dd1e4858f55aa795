use crate::compositing::{BlendPolicy, Compositor};
use crate::enhance::{enhance, EnhanceConfig};
use crate::error::{ensure_non_empty, CompositeError};
use crate::fitting::{fit, FitPolicy, Placement};
use crate::matting::alpha::{attach_alpha, split_alpha};
use crate::matting::{
    ChromaKeyConfig, ChromaKeyEstimator, MaskEstimator, MaskRefiner, RefineConfig,
};
use image::{GrayImage, RgbImage};
use std::borrow::Cow;
use std::time::Instant;

/// Finished composite, plus the refined mask when one was estimated
#[derive(Debug)]
pub struct Outcome {
    pub image: RgbImage,
    /// At the foreground's original resolution
    pub mask: Option<GrayImage>,
}

/// One configured run: estimate, refine, fit, composite.
///
/// All strategies are chosen at construction; `run` only sequences them.
pub struct Pipeline {
    estimator: Option<Box<dyn MaskEstimator>>,
    refiner: Option<MaskRefiner>,
    /// `None` places the foreground unscaled at the origin
    foreground_fit: Option<FitPolicy>,
    /// Resize applied to the background before anything else, targeting the
    /// foreground's frame
    background_fit: Option<FitPolicy>,
    enhancement: Option<EnhanceConfig>,
    compositor: Compositor,
}

impl Pipeline {
    pub fn new(
        estimator: Option<Box<dyn MaskEstimator>>,
        refiner: Option<MaskRefiner>,
        foreground_fit: Option<FitPolicy>,
        blend: BlendPolicy,
    ) -> Result<Self, CompositeError> {
        if blend.needs_mask() && estimator.is_none() {
            return Err(CompositeError::InvalidConfig(
                "alpha blending needs a mask estimator".to_string(),
            ));
        }
        let foreground_fit = foreground_fit.map(FitPolicy::validate).transpose()?;

        Ok(Self {
            estimator,
            refiner,
            foreground_fit,
            background_fit: None,
            enhancement: None,
            compositor: Compositor::new(blend)?,
        })
    }

    pub fn with_background_fit(mut self, policy: FitPolicy) -> Result<Self, CompositeError> {
        self.background_fit = Some(policy.validate()?);
        Ok(self)
    }

    pub fn with_enhancement(mut self, config: EnhanceConfig) -> Result<Self, CompositeError> {
        self.enhancement = Some(config.validate()?);
        Ok(self)
    }

    /// Person cut out by `estimator`, background cover-cropped to the
    /// photo's frame, alpha blended at the origin.
    pub fn background_replacement(
        estimator: Box<dyn MaskEstimator>,
    ) -> Result<Self, CompositeError> {
        Self::new(
            Some(estimator),
            Some(MaskRefiner::new(RefineConfig::segmentation())?),
            None,
            BlendPolicy::Alpha,
        )?
        .with_background_fit(FitPolicy::CoverCrop)
    }

    /// Green-screen subject keyed out, fitted inside the background with a
    /// margin and alpha blended in the centre.
    pub fn green_screen(
        config: ChromaKeyConfig,
        padding_percent: f64,
    ) -> Result<Self, CompositeError> {
        Self::new(
            Some(Box::new(ChromaKeyEstimator::new(config)?)),
            Some(MaskRefiner::new(RefineConfig::chroma_key())?),
            Some(FitPolicy::fit_within(padding_percent)?),
            BlendPolicy::Alpha,
        )
    }

    /// Whole photo scaled to a fraction of the background height and
    /// dropped in the centre.
    pub fn inset(
        scale_factor: f64,
        blend: BlendPolicy,
        enhancement: Option<EnhanceConfig>,
    ) -> Result<Self, CompositeError> {
        let pipeline = Self::new(None, None, Some(FitPolicy::fixed_fraction(scale_factor)?), blend)?;
        match enhancement {
            Some(config) => pipeline.with_enhancement(config),
            None => Ok(pipeline),
        }
    }

    pub fn run(
        &mut self,
        foreground: &RgbImage,
        background: &RgbImage,
    ) -> Result<Outcome, CompositeError> {
        let _span = tracing::info_span!("pipeline").entered();
        let started = Instant::now();

        ensure_non_empty("foreground", foreground.dimensions())?;
        ensure_non_empty("background", background.dimensions())?;

        let background = match &self.background_fit {
            Some(policy) => Cow::Owned(fit(background, foreground.dimensions(), policy)?.0),
            None => Cow::Borrowed(background),
        };

        let mask = match self.estimator.as_mut() {
            Some(estimator) => {
                let estimate_start = Instant::now();
                let raw = estimator.estimate(foreground)?;
                if raw.dimensions() != foreground.dimensions() {
                    return Err(CompositeError::Processing(format!(
                        "{} returned a {:?} mask for a {:?} image",
                        estimator.name(),
                        raw.dimensions(),
                        foreground.dimensions()
                    )));
                }
                tracing::debug!(
                    "{} mask in {:.1}ms",
                    estimator.name(),
                    estimate_start.elapsed().as_secs_f64() * 1000.0
                );
                Some(match &self.refiner {
                    Some(refiner) => refiner.refine(&raw),
                    None => raw,
                })
            }
            None => None,
        };

        let foreground = match &self.enhancement {
            Some(config) => Cow::Owned(enhance(foreground, config)),
            None => Cow::Borrowed(foreground),
        };

        let target = background.dimensions();
        tracing::debug!(
            "Fit {:?}, blend {:?}",
            self.foreground_fit,
            self.compositor.policy()
        );
        let (layer, layer_mask, placement) = match (&self.foreground_fit, &mask) {
            (None, _) => (
                foreground.clone(),
                mask.as_ref().map(Cow::Borrowed),
                Placement::full(foreground.dimensions()),
            ),
            (Some(policy), Some(mask)) => {
                // Colour and matte are resized as one RGBA layer so they stay aligned
                let (fitted, placement) = fit(&attach_alpha(&foreground, mask)?, target, policy)?;
                let (colour, alpha) = split_alpha(&fitted);
                (Cow::Owned(colour), Some(Cow::Owned(alpha)), placement)
            }
            (Some(policy), None) => {
                let (fitted, placement) = fit(&*foreground, target, policy)?;
                (Cow::Owned(fitted), None, placement)
            }
        };

        let image = self.compositor.composite(
            &background,
            &layer,
            layer_mask.as_deref(),
            placement,
        )?;

        tracing::info!(
            "Composited {}x{} layer at ({}, {}) onto {}x{} in {:.1}ms",
            placement.width,
            placement.height,
            placement.x,
            placement.y,
            target.0,
            target.1,
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Outcome { image, mask })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{noise, solid, BLUE, GREEN, RED};
    use image::{Luma, Rgb};

    /// Marks the left half of any image as foreground
    struct LeftHalf;

    impl MaskEstimator for LeftHalf {
        fn estimate(&mut self, image: &RgbImage) -> Result<GrayImage, CompositeError> {
            let (width, height) = image.dimensions();
            Ok(GrayImage::from_fn(width, height, |x, _| {
                Luma([if x < width / 2 { 255 } else { 0 }])
            }))
        }

        fn name(&self) -> &'static str {
            "left-half"
        }
    }

    /// Everything is foreground
    struct Everything;

    impl MaskEstimator for Everything {
        fn estimate(&mut self, image: &RgbImage) -> Result<GrayImage, CompositeError> {
            Ok(GrayImage::from_pixel(image.width(), image.height(), Luma([255])))
        }

        fn name(&self) -> &'static str {
            "everything"
        }
    }

    struct WrongSize;

    impl MaskEstimator for WrongSize {
        fn estimate(&mut self, image: &RgbImage) -> Result<GrayImage, CompositeError> {
            Ok(GrayImage::new(image.width() + 1, image.height()))
        }

        fn name(&self) -> &'static str {
            "wrong-size"
        }
    }

    #[test]
    fn pure_green_subject_leaves_background_untouched() {
        let foreground = solid(100, 100, GREEN);
        let background = solid(200, 200, BLUE);
        let mut pipeline = Pipeline::new(
            Some(Box::new(ChromaKeyEstimator::new(ChromaKeyConfig::default()).unwrap())),
            Some(MaskRefiner::new(RefineConfig::chroma_key()).unwrap()),
            Some(FitPolicy::fixed_fraction(0.5).unwrap()),
            BlendPolicy::Alpha,
        )
        .unwrap();

        let outcome = pipeline.run(&foreground, &background).unwrap();

        assert_eq!(outcome.image.get_pixel(100, 100), &BLUE);
        assert_eq!(outcome.image, background);
        let mask = outcome.mask.unwrap();
        assert_eq!(mask.dimensions(), (100, 100));
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn inset_lands_centred_at_a_third() {
        let photo = noise(300, 300, 11);
        let background = solid(1000, 800, BLUE);
        let mut pipeline =
            Pipeline::inset(1.0 / 3.0, BlendPolicy::FixedOpacity { opacity: 1.0 }, None).unwrap();

        let outcome = pipeline.run(&photo, &background).unwrap();
        let image = &outcome.image;

        assert_eq!(image.dimensions(), (1000, 800));
        assert!(outcome.mask.is_none());
        // Layer spans 367..633 x 267..533
        assert_eq!(image.get_pixel(366, 400), &BLUE);
        assert_eq!(image.get_pixel(633, 400), &BLUE);
        assert_eq!(image.get_pixel(500, 266), &BLUE);
        assert_eq!(image.get_pixel(500, 533), &BLUE);
        assert_ne!(image.get_pixel(367, 267), &BLUE);
        assert_ne!(image.get_pixel(632, 532), &BLUE);
    }

    #[test]
    fn replacement_covers_the_photo_frame() {
        let photo = solid(40, 30, RED);
        let background = noise(80, 40, 4);
        let mut pipeline = Pipeline::background_replacement(Box::new(LeftHalf)).unwrap();

        let outcome = pipeline.run(&photo, &background).unwrap();
        let (expected_bg, _) = fit(&background, (40, 30), &FitPolicy::CoverCrop).unwrap();

        assert_eq!(outcome.image.dimensions(), (40, 30));
        assert_eq!(outcome.mask.as_ref().map(|m| m.dimensions()), Some((40, 30)));

        assert_eq!(outcome.image.get_pixel(2, 15), &RED);
        assert_eq!(outcome.image.get_pixel(38, 15), expected_bg.get_pixel(38, 15));
    }

    #[test]
    fn opaque_mask_keeps_the_foreground_exactly() {
        let photo = solid(20, 20, RED);
        let background = solid(20, 20, BLUE);
        let mut pipeline = Pipeline::background_replacement(Box::new(Everything)).unwrap();

        let outcome = pipeline.run(&photo, &background).unwrap();

        assert!(outcome.mask.unwrap().pixels().all(|p| p[0] == 255));
        assert_eq!(outcome.image, photo);
    }

    #[test]
    fn green_screen_subject_is_fitted_inside_margin() {
        let mut photo = solid(60, 40, GREEN);
        for y in 10..30 {
            for x in 20..40 {
                photo.put_pixel(x, y, RED);
            }
        }
        let background = solid(200, 100, BLUE);
        let mut pipeline = Pipeline::green_screen(ChromaKeyConfig::default(), 10.0).unwrap();

        let outcome = pipeline.run(&photo, &background).unwrap();
        let image = &outcome.image;

        // 60x40 fits 180x90 as 135x90 at (32, 5)
        assert_eq!(image.get_pixel(0, 0), &BLUE);
        assert_eq!(image.get_pixel(40, 50), &BLUE);
        let Rgb([r, _, b]) = *image.get_pixel(100, 50);
        assert!(r > 200 && b < 50, "centre {r} {b}");
    }

    #[test]
    fn mask_of_the_wrong_size_is_rejected() {
        let mut pipeline = Pipeline::new(Some(Box::new(WrongSize)), None, None, BlendPolicy::Alpha)
            .unwrap();

        let err = pipeline
            .run(&solid(10, 10, RED), &solid(10, 10, BLUE))
            .unwrap_err();
        assert!(matches!(err, CompositeError::Processing(_)));
    }

    #[test]
    fn alpha_blend_without_estimator_is_rejected() {
        let err = Pipeline::new(None, None, None, BlendPolicy::Alpha).err().unwrap();
        assert!(matches!(err, CompositeError::InvalidConfig(_)));
    }

    #[test]
    fn empty_input_fails_before_estimation() {
        let mut pipeline = Pipeline::background_replacement(Box::new(WrongSize)).unwrap();
        let err = pipeline
            .run(&RgbImage::new(0, 5), &solid(10, 10, BLUE))
            .unwrap_err();
        assert!(matches!(err, CompositeError::Dimension(_)));
    }
}
