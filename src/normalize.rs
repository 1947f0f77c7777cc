//! Post-parse normalization
//!
//! Parsers emit parameters under their source format's native keys. This
//! pass renames them into the shared vocabulary through per-format
//! dictionaries, clamps known-ranged values, discards brushes that ended up
//! with no image data, fills in names for nameless brushes, and optionally
//! splits multi-frame brushes for hosts that want one texture per brush.

use crate::detect::FormatKind;
use crate::types::{
    BrushKind, Diagnostic, ParamValue, Parameters, ParseOptions, ParseOutput, ParsedBrush,
};

/// Source-key → shared-vocabulary renames, per format.
fn dictionary(kind: FormatKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        FormatKind::Abr => &[
            ("Dmtr", "diameter"),
            ("Spcn", "spacing"),
            ("Angl", "angle"),
            ("Rndn", "roundness"),
            ("Hrdn", "hardness"),
            ("sizeJitter", "size_jitter"),
            ("opacityJitter", "opacity_jitter"),
        ],
        FormatKind::Gbr | FormatKind::Gih => &[("spacing", "spacing")],
        FormatKind::Brushset => &[
            ("paintSize", "size"),
            ("paintOpacity", "opacity"),
            ("plotSpacing", "spacing"),
            ("plotJitter", "scatter"),
            ("shapeRotation", "angle"),
            ("grainScale", "texture_scale"),
        ],
        FormatKind::Sut => &[
            ("BrushInterval", "spacing"),
            ("BrushHardness", "hardness"),
            ("BrushRotation", "angle"),
            ("BrushThickness", "roundness"),
            ("BrushOpacity", "opacity"),
        ],
    }
}

/// Shared-vocabulary keys holding a 0..=1 ratio. Sources disagree on whether
/// these are stored as percentages, so values above 1 are read as percent.
const RATIO_KEYS: [&str; 8] = [
    "spacing",
    "opacity",
    "hardness",
    "roundness",
    "size",
    "scatter",
    "size_jitter",
    "opacity_jitter",
];

/// Normalize a parser's raw output. [`parse_bytes`](crate::parse_bytes)
/// runs this automatically; it is public for callers driving a format
/// parser directly.
pub fn normalize(
    raw: ParseOutput,
    kind: FormatKind,
    stem: &str,
    options: &ParseOptions,
) -> ParseOutput {
    let mut out = ParseOutput {
        brushes: Vec::with_capacity(raw.brushes.len()),
        diagnostics: raw.diagnostics,
    };

    let mut survivors = Vec::with_capacity(raw.brushes.len());
    for (index, mut brush) in raw.brushes.into_iter().enumerate() {
        if brush.textures.is_empty() {
            let label = if brush.name.is_empty() {
                format!("brush {}", index)
            } else {
                brush.name.clone()
            };
            tracing::debug!(brush = label, "discarding brush without image data");
            out.diagnostics
                .push(Diagnostic::skip(label, "no image data"));
            continue;
        }
        brush.parameters = rename_parameters(brush.parameters, dictionary(kind));
        clamp_parameters(&mut brush.parameters);
        survivors.push(brush);
    }

    let base = if stem.is_empty() { "Brush" } else { stem };
    let single = survivors.len() == 1;
    for (index, brush) in survivors.iter_mut().enumerate() {
        if brush.name.is_empty() {
            brush.name = if single {
                base.to_string()
            } else {
                format!("{} {}", base, index + 1)
            };
        }
    }

    for brush in survivors {
        if options.split_multi_frame && brush.textures.len() > 1 {
            let kind = match brush.kind {
                BrushKind::Stroke => BrushKind::Stamp,
                other => other,
            };
            for (i, frame) in brush.textures.into_iter().enumerate() {
                out.brushes.push(ParsedBrush {
                    name: format!("{} {}", brush.name, i + 1),
                    kind,
                    parameters: brush.parameters.clone(),
                    textures: vec![frame],
                });
            }
        } else {
            out.brushes.push(brush);
        }
    }

    out
}

fn rename_parameters(
    parameters: Parameters,
    dictionary: &[(&'static str, &'static str)],
) -> Parameters {
    let mut renamed = Parameters::with_capacity(parameters.len());
    for (key, value) in parameters {
        let name = dictionary
            .iter()
            .find(|(from, _)| *from == key)
            .map(|(_, to)| (*to).to_string())
            .unwrap_or(key);
        renamed.insert(name, value);
    }
    renamed
}

fn clamp_parameters(parameters: &mut Parameters) {
    for (key, value) in parameters.iter_mut() {
        let ParamValue::Number(n) = value else { continue };
        if RATIO_KEYS.contains(&key.as_str()) {
            *n = ratio_0_1(*n);
        } else if key == "angle" {
            *n = n.rem_euclid(360.0);
        }
    }
}

/// Read a ratio that may have been stored as a percentage.
fn ratio_0_1(mut v: f64) -> f64 {
    if v > 1.0 {
        v /= 100.0;
    }
    v.clamp(0.0, 1.0)
}
