//! Clip catalogue — semantic clip identifiers to card asset tags.
//!
//! The UI names clips by screen and slide; the host-side import tool names
//! them by tag. This table is the only place both vocabularies meet. Tags
//! are opaque 5-byte values assigned by the import tool; the per-app slide
//! clips share a 4-byte prefix with the slide number in the last byte where
//! the import tool emits them that way.

use assets::AssetTag;
use ui::{AppId, ClipId};

/// Greeting played over the intro screen.
pub const GREETING: AssetTag = AssetTag::new([0x01, 0x28, 0x15, 0x72, 0x01]);

/// Main track on the audio player screen.
pub const SHOWCASE: AssetTag = AssetTag::new([0x71, 0x72, 0x78, 0x74, 0x84]);

/// Device-story slides share a prefix; the last byte is the slide number.
const DEVICE_PREFIX: [u8; 4] = [0x66, 0x25, 0x91, 0x88];

/// Language clips sit behind the greeting in the same tag family.
const LANGUAGE_PREFIX: [u8; 4] = [0x01, 0x28, 0x15, 0x72];

/// Portfolio clips predate the prefix scheme; one tag per slide.
const PORTFOLIO: [AssetTag; 6] = [
    AssetTag::new([0x63, 0x49, 0x53, 0x83, 0x63]),
    AssetTag::new([0x39, 0x38, 0x75, 0x80, 0x35]),
    AssetTag::new([0x76, 0x72, 0x65, 0x89, 0x91]),
    AssetTag::new([0x7D, 0x80, 0x7B, 0x76, 0x79]),
    AssetTag::new([0x81, 0x75, 0x7B, 0x72, 0x73]),
    AssetTag::new([0x72, 0x70, 0x82, 0x70, 0x73]),
];

/// Resolve a semantic clip to its card tag.
///
/// Returns `None` for a slide with no recorded clip; callers treat that the
/// same as a missing asset.
pub fn clip_tag(clip: ClipId) -> Option<AssetTag> {
    match clip {
        ClipId::Greeting => Some(GREETING),
        ClipId::Showcase => Some(SHOWCASE),
        ClipId::Slide(AppId::Device, slide) if slide < ui::state::DEVICE_SLIDES => {
            let [a, b, c, d] = DEVICE_PREFIX;
            Some(AssetTag::new([a, b, c, d, slide]))
        }
        ClipId::Slide(AppId::Languages, slide) if slide < ui::state::LANGUAGE_SLIDES => {
            // Slide zero (English) reuses the greeting; the recorded
            // translations follow it in the same family.
            let [a, b, c, d] = LANGUAGE_PREFIX;
            Some(AssetTag::new([a, b, c, d, slide.saturating_add(1)]))
        }
        ClipId::Slide(AppId::Portfolio, slide) => PORTFOLIO.get(usize::from(slide)).copied(),
        ClipId::Slide(_, _) => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn every_slideshow_slide_resolves() {
        for slide in 0..ui::state::DEVICE_SLIDES {
            assert!(clip_tag(ClipId::Slide(AppId::Device, slide)).is_some());
        }
        for slide in 0..ui::state::LANGUAGE_SLIDES {
            assert!(clip_tag(ClipId::Slide(AppId::Languages, slide)).is_some());
        }
        for slide in 0..ui::state::PORTFOLIO_SLIDES {
            assert!(clip_tag(ClipId::Slide(AppId::Portfolio, slide)).is_some());
        }
    }

    #[test]
    fn page_apps_have_no_clips() {
        assert_eq!(clip_tag(ClipId::Slide(AppId::AboutMe, 0)), None);
        assert_eq!(clip_tag(ClipId::Slide(AppId::Skills, 0)), None);
    }

    #[test]
    fn out_of_range_slides_resolve_to_nothing() {
        assert_eq!(
            clip_tag(ClipId::Slide(AppId::Portfolio, ui::state::PORTFOLIO_SLIDES)),
            None
        );
    }

    #[test]
    fn english_language_slide_reuses_the_greeting() {
        assert_eq!(
            clip_tag(ClipId::Slide(AppId::Languages, 0)),
            Some(GREETING)
        );
    }

    #[test]
    fn tags_are_distinct() {
        let mut seen = std::vec::Vec::new();
        seen.push(clip_tag(ClipId::Greeting).unwrap());
        seen.push(clip_tag(ClipId::Showcase).unwrap());
        for slide in 0..ui::state::DEVICE_SLIDES {
            seen.push(clip_tag(ClipId::Slide(AppId::Device, slide)).unwrap());
        }
        // Language slide 0 deliberately aliases the greeting; skip it.
        for slide in 1..ui::state::LANGUAGE_SLIDES {
            seen.push(clip_tag(ClipId::Slide(AppId::Languages, slide)).unwrap());
        }
        for slide in 0..ui::state::PORTFOLIO_SLIDES {
            seen.push(clip_tag(ClipId::Slide(AppId::Portfolio, slide)).unwrap());
        }
        let total = seen.len();
        seen.sort_unstable_by_key(|t| *t.as_bytes());
        seen.dedup();
        assert_eq!(seen.len(), total);
    }
}
