//! CSS selectors for the rendered post view
//!
//! These mirror the site's current markup. When the site ships a redesign,
//! this file is the only place that needs to change for post extraction.

/// Container that signals the post view has rendered
pub const POST_WRAPPER: &str = ".b-post__wrapper";

/// Marker present on posts the account has no access to
pub const LOCKED_MARKER: &str = ".b-post__purchase";

/// Post description text element
pub const DESCRIPTION: &str = ".b-post__text-el";

/// Post date display element
pub const TIMESTAMP: &str = ".b-post__date > span";

/// Multi-slide media container
pub const SLIDES_CONTAINER: &str = ".swiper-wrapper";

/// Images inside the multi-slide container
pub const SLIDE_IMAGES: &str = ".swiper-wrapper img[draggable=\"false\"]";

/// Single responsive image outside a slide container
pub const SINGLE_IMAGE: &str = ".img-responsive";

/// Video play control; clicking it makes the player attach its sources
pub const PLAY_BUTTON: &str = ".vjs-big-play-button";

/// Quality variants probed in preference order
pub const VIDEO_QUALITIES: &[&str] = &["720", "original", "480", "240"];

/// Selector for a specific video quality variant's source element
pub fn video_source(quality: &str) -> String {
    format!("video source[data-quality=\"{}\"]", quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_source_selector() {
        assert_eq!(
            video_source("720"),
            "video source[data-quality=\"720\"]"
        );
    }
}
