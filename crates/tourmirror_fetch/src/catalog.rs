//! Fixed asset catalogs the showcase client loads without manifest help.
//! These track what the player requests at runtime rather than anything the
//! bundles declare, so they are maintained by hand.

use tourmirror_core::chunk::ChunkEntry;
use tourmirror_core::chunk::CssChunkEntry;

pub const LANGUAGE_CODES: &[&str] = &[
  "af", "sq", "ar-SA", "ar-IQ", "ar-EG", "ar-LY", "ar-DZ", "ar-MA", "ar-TN", "ar-OM", "ar-YE",
  "ar-SY", "ar-JO", "ar-LB", "ar-KW", "ar-AE", "ar-BH", "ar-QA", "eu", "bg", "be", "ca", "zh-TW",
  "zh-CN", "zh-HK", "zh-SG", "hr", "cs", "da", "nl", "nl-BE", "en", "en-US", "en-EG", "en-AU",
  "en-GB", "en-CA", "en-NZ", "en-IE", "en-ZA", "en-JM", "en-BZ", "en-TT", "et", "fo", "fa", "fi",
  "fr", "fr-BE", "fr-CA", "fr-CH", "fr-LU", "gd", "gd-IE", "de", "de-CH", "de-AT", "de-LU",
  "de-LI", "el", "he", "hi", "hu", "is", "id", "it", "it-CH", "ja", "ko", "lv", "lt", "mk", "mt",
  "no", "pl", "pt-BR", "pt", "rm", "ro", "ro-MO", "ru", "ru-MI", "sz", "sr", "sk", "sl", "sb",
  "es", "es-AR", "es-GT", "es-CR", "es-PA", "es-DO", "es-MX", "es-VE", "es-CO", "es-PE", "es-EC",
  "es-CL", "es-UY", "es-PY", "es-BO", "es-SV", "es-HN", "es-NI", "es-PR", "sx", "sv", "sv-FI",
  "th", "ts", "tn", "tr", "uk", "ur", "ve", "vi", "xh", "ji", "zu",
];

pub const FONT_FILES: &[&str] = &[
  "ibm-plex-sans-100",
  "ibm-plex-sans-100italic",
  "ibm-plex-sans-200",
  "ibm-plex-sans-200italic",
  "ibm-plex-sans-300",
  "ibm-plex-sans-300italic",
  "ibm-plex-sans-500",
  "ibm-plex-sans-500italic",
  "ibm-plex-sans-600",
  "ibm-plex-sans-600italic",
  "ibm-plex-sans-700",
  "ibm-plex-sans-700italic",
  "ibm-plex-sans-italic",
  "ibm-plex-sans-regular",
  "mp-font",
  "roboto-100",
  "roboto-100italic",
  "roboto-300",
  "roboto-300italic",
  "roboto-500",
  "roboto-500italic",
  "roboto-700",
  "roboto-700italic",
  "roboto-900",
  "roboto-900italic",
  "roboto-italic",
  "roboto-regular",
];

/// Image basenames under images/; .png is assumed unless the entry carries
/// its own extension.
pub const IMAGE_FILES: &[&str] = &[
  "360_placement_pin_mask",
  "chrome",
  "Desktop-help-play-button.svg",
  "Desktop-help-spacebar",
  "edge",
  "escape",
  "exterior",
  "exterior_hover",
  "firefox",
  "headset-cardboard",
  "headset-quest",
  "interior",
  "interior_hover",
  "matterport-logo-light.svg",
  "mattertag-disc-128-free.v1",
  "mobile-help-play-button.svg",
  "nav_help_360",
  "nav_help_click_inside",
  "nav_help_gesture_drag",
  "nav_help_gesture_drag_two_finger",
  "nav_help_gesture_pinch",
  "nav_help_gesture_position",
  "nav_help_gesture_position_two_finger",
  "nav_help_gesture_tap",
  "nav_help_inside_key",
  "nav_help_keyboard_all",
  "nav_help_keyboard_left_right",
  "nav_help_keyboard_up_down",
  "nav_help_mouse_position_right",
  "nav_help_mouse_zoom",
  "nav_help_tap_inside",
  "nav_help_zoom_keys",
  "NoteColor",
  "NoteIcon",
  "pinAnchor",
  "puck_256_red",
  "roboto-700-42_0",
  "safari",
  "scope.svg",
  "showcase-password-background.jpg",
  "surface_grid_planar_256",
  "tagbg",
  "tagmask",
  "vert_arrows",
  "headset-quest-2",
  "pinIconDefault",
  "tagColor",
  "atlas",
];

pub const BASE_ASSETS: &[&str] = &[
  "css/showcase.css",
  "css/unsupported_browser.css",
  "cursors/grab.png",
  "cursors/grabbing.png",
  "cursors/zoom-in.png",
  "cursors/zoom-out.png",
  "locale/strings.json",
  "css/ws-blur.css",
  "css/core.css",
  "css/split.css",
  "css/late.css",
  "matterport-logo.svg",
  "css/init.css",
];

/// The full static-origin asset list for one mirror: base assets, manifest
/// chunks, images, fonts, and every locale.
pub fn static_assets(js_chunks: &[ChunkEntry], css_chunks: &[CssChunkEntry]) -> Vec<String> {
  let mut assets: Vec<String> = BASE_ASSETS.iter().map(|asset| asset.to_string()).collect();
  assets.extend(js_chunks.iter().map(ChunkEntry::file_name));
  assets.extend(css_chunks.iter().map(CssChunkEntry::file_name));
  for image in IMAGE_FILES {
    if image.ends_with(".jpg") || image.ends_with(".svg") {
      assets.push(format!("images/{image}"));
    } else {
      assets.push(format!("images/{image}.png"));
    }
  }
  for font in FONT_FILES {
    assets.push(format!("fonts/{font}.woff"));
    assets.push(format!("fonts/{font}.woff2"));
  }
  for code in LANGUAGE_CODES {
    assets.push(format!("locale/messages/strings_{code}.json"));
  }
  assets
}

/// Cube-face tile names across the four resolution depths. Depth n is a
/// 2^n by 2^n grid per face.
pub fn tile_variants() -> Vec<String> {
  let depths = ["512", "1k", "2k", "4k"];
  let mut variants = Vec::new();
  for (depth, z) in depths.iter().enumerate() {
    let span = 1 << depth;
    for x in 0..span {
      for y in 0..span {
        for face in 0..6 {
          variants.push(format!("{z}_face{face}_{x}_{y}.jpg"));
        }
      }
    }
  }
  variants
}

/// A crop/width preset the client may request for dollhouse and floorplan
/// textures at runtime.
pub struct CropPreset {
  /// Query prefix, ending just before the x/y offsets.
  pub query_prefix: &'static str,
  /// Offset grid step, in hundredths.
  pub step_hundredths: u32,
}

pub const CROP_PRESETS: &[CropPreset] = &[
  CropPreset { query_prefix: "width=512&crop=1024,1024,", step_hundredths: 50 },
  CropPreset { query_prefix: "crop=512,512,", step_hundredths: 25 },
];

/// Offsets 0 <= v < 1 at the preset's step, rendered the way the client
/// renders them in query strings: "0.0", "0.25", "0.5".
pub fn crop_offsets(step_hundredths: u32) -> Vec<String> {
  (0..100).step_by(step_hundredths as usize).map(format_hundredths).collect()
}

fn format_hundredths(hundredths: u32) -> String {
  if hundredths % 100 == 0 {
    format!("{}.0", hundredths / 100)
  } else if hundredths % 10 == 0 {
    format!("{}.{}", hundredths / 100, hundredths % 100 / 10)
  } else {
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
  }
}

/// Query string suffix requested from the CDN for one crop variant.
pub fn variant_query(preset: &CropPreset, x: &str, y: &str) -> String {
  format!("{}x{x},y{y}", preset.query_prefix)
}

/// Local file name suffix for one crop variant. Must agree with the name the
/// replay server probes for when a crop query comes in.
pub fn variant_file_suffix(preset: &CropPreset, x: &str, y: &str) -> String {
  format!("{}x{x},y{y}.jpg", preset.query_prefix.replace('&', "_"))
}
