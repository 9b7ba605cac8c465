use std::fs;
use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::image::Rgb;
use crate::palette::Palette;
use crate::transform::{self, Channel, DEFAULT_NOISE_RATIO, DEFAULT_SEPIA_DEPTH};

/// Version written into chain preset files. Files with a different major
/// version are refused.
pub const CURRENT_CHAIN_VERSION: Version = Version::new(1, 0, 0);

/// The kind of an effect, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Grey,
    BlackWhite,
    Invert,
    Brightness,
    Contrast,
    Red,
    Green,
    Blue,
    Sepia,
    BlueYellow,
    Noise,
    Colorize,
    Floodfill,
}

impl EffectKind {
    /// Snake-case identifier used on the command line and in preset files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grey => "grey",
            Self::BlackWhite => "black_white",
            Self::Invert => "invert",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Sepia => "sepia",
            Self::BlueYellow => "blue_yellow",
            Self::Noise => "noise",
            Self::Colorize => "colorize",
            Self::Floodfill => "floodfill",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::all_builtin()
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| CoreError::UnknownEffect(name.to_string()))
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Grey => "Greys",
            Self::BlackWhite => "Black & White",
            Self::Invert => "Invert",
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Blue => "Blue",
            Self::Sepia => "Sepia",
            Self::BlueYellow => "Blue & Yellow",
            Self::Noise => "Noise",
            Self::Colorize => "Colorize",
            Self::Floodfill => "Colorize (floodfill)",
        }
    }

    /// Title shown next to the progress bar while this effect runs.
    pub fn progress_label(&self) -> &'static str {
        match self {
            Self::Grey => "Greys",
            Self::BlackWhite => "Black and white image",
            Self::Invert => "Invert colors",
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Red => "Red channel",
            Self::Green => "Green channel",
            Self::Blue => "Blue channel",
            Self::Sepia => "Sepia",
            Self::BlueYellow => "Blue and yellow image",
            Self::Noise => "Noise",
            Self::Colorize => "Fake color",
            Self::Floodfill => "Fake color (floodfill)",
        }
    }

    /// Whether this effect reports progress per row or per column.
    pub fn progress_axis(&self) -> ProgressAxis {
        match self {
            Self::Floodfill => ProgressAxis::Column,
            _ => ProgressAxis::Row,
        }
    }

    /// Parameter definitions for this effect kind.
    pub fn parameter_definitions(&self) -> Vec<ParameterDefinition> {
        let factor = |label: &'static str, limit: i64| ParameterDefinition {
            name: "factor",
            label,
            param_type: ParameterType::Int {
                default: 0,
                min: -limit,
                max: limit,
            },
        };
        match self {
            Self::Brightness => vec![factor("Brightness", 255)],
            Self::Contrast => vec![factor("Contrast", (transform::CONTRAST_LIMIT - 1) as i64)],
            Self::Red => vec![factor("Red", 255)],
            Self::Green => vec![factor("Green", 255)],
            Self::Blue => vec![factor("Blue", 255)],
            Self::Sepia => vec![ParameterDefinition {
                name: "depth",
                label: "Depth",
                param_type: ParameterType::Int {
                    default: DEFAULT_SEPIA_DEPTH as i64,
                    min: -255,
                    max: 255,
                },
            }],
            Self::Noise => vec![ParameterDefinition {
                name: "ratio",
                label: "Ratio",
                param_type: ParameterType::Float {
                    default: DEFAULT_NOISE_RATIO,
                    min: 0.0,
                    max: 10.0,
                },
            }],
            Self::Grey
            | Self::BlackWhite
            | Self::Invert
            | Self::BlueYellow
            | Self::Colorize
            | Self::Floodfill => Vec::new(),
        }
    }

    /// All built-in effect kinds.
    pub fn all_builtin() -> Vec<EffectKind> {
        vec![
            Self::Grey,
            Self::BlackWhite,
            Self::Invert,
            Self::Brightness,
            Self::Contrast,
            Self::Red,
            Self::Green,
            Self::Blue,
            Self::Sepia,
            Self::BlueYellow,
            Self::Noise,
            Self::Colorize,
            Self::Floodfill,
        ]
    }
}

/// Progress granularity of an effect pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressAxis {
    Row,
    Column,
}

/// The type and valid range of a numeric parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParameterType {
    Int { default: i64, min: i64, max: i64 },
    Float { default: f64, min: f64, max: f64 },
}

impl ParameterType {
    pub fn default_value(&self) -> f64 {
        match *self {
            Self::Int { default, .. } => default as f64,
            Self::Float { default, .. } => default,
        }
    }

    fn accepts(&self, value: f64) -> bool {
        match *self {
            Self::Int { min, max, .. } => {
                value.fract() == 0.0 && value >= min as f64 && value <= max as f64
            }
            Self::Float { min, max, .. } => value.is_finite() && value >= min && value <= max,
        }
    }
}

/// Definition of a parameter on an effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDefinition {
    pub name: &'static str,
    pub label: &'static str,
    pub param_type: ParameterType,
}

/// An effect with its strongly-typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Grey,
    BlackWhite,
    Invert,
    Brightness {
        factor: i32,
    },
    Contrast {
        factor: i32,
    },
    Red {
        factor: i32,
    },
    Green {
        factor: i32,
    },
    Blue {
        factor: i32,
    },
    Sepia {
        #[serde(default = "default_sepia_depth")]
        depth: i32,
    },
    BlueYellow,
    Noise {
        #[serde(default = "default_noise_ratio")]
        ratio: f64,
    },
    Colorize {
        #[serde(default)]
        palette: Palette,
    },
    Floodfill {
        #[serde(default)]
        palette: Palette,
    },
}

fn default_sepia_depth() -> i32 {
    DEFAULT_SEPIA_DEPTH
}

fn default_noise_ratio() -> f64 {
    DEFAULT_NOISE_RATIO
}

impl Effect {
    /// Build an effect from loosely-typed named parameters. Missing
    /// parameters take their defaults; unknown names are rejected.
    pub fn from_kind_params(kind: EffectKind, params: &[(String, f64)]) -> Result<Self> {
        let defs = kind.parameter_definitions();
        for (name, value) in params {
            let Some(def) = defs.iter().find(|def| def.name == name) else {
                return Err(CoreError::UnknownParameter {
                    effect: kind.name(),
                    name: name.clone(),
                });
            };
            if !def.param_type.accepts(*value) {
                return Err(CoreError::InvalidParameter {
                    effect: kind.name(),
                    name: def.name,
                    value: *value,
                    reason: "outside the parameter's range",
                });
            }
        }
        let get = |name: &str| {
            params
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| *v)
                .or_else(|| {
                    defs.iter()
                        .find(|def| def.name == name)
                        .map(|def| def.param_type.default_value())
                })
                .unwrap_or(0.0)
        };
        let int = |name: &str| get(name) as i32;

        let effect = match kind {
            EffectKind::Grey => Self::Grey,
            EffectKind::BlackWhite => Self::BlackWhite,
            EffectKind::Invert => Self::Invert,
            EffectKind::Brightness => Self::Brightness {
                factor: int("factor"),
            },
            EffectKind::Contrast => Self::Contrast {
                factor: int("factor"),
            },
            EffectKind::Red => Self::Red {
                factor: int("factor"),
            },
            EffectKind::Green => Self::Green {
                factor: int("factor"),
            },
            EffectKind::Blue => Self::Blue {
                factor: int("factor"),
            },
            EffectKind::Sepia => Self::Sepia {
                depth: int("depth"),
            },
            EffectKind::BlueYellow => Self::BlueYellow,
            EffectKind::Noise => Self::Noise {
                ratio: get("ratio"),
            },
            EffectKind::Colorize => Self::Colorize {
                palette: Palette::default(),
            },
            EffectKind::Floodfill => Self::Floodfill {
                palette: Palette::default(),
            },
        };
        Ok(effect)
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            Self::Grey => EffectKind::Grey,
            Self::BlackWhite => EffectKind::BlackWhite,
            Self::Invert => EffectKind::Invert,
            Self::Brightness { .. } => EffectKind::Brightness,
            Self::Contrast { .. } => EffectKind::Contrast,
            Self::Red { .. } => EffectKind::Red,
            Self::Green { .. } => EffectKind::Green,
            Self::Blue { .. } => EffectKind::Blue,
            Self::Sepia { .. } => EffectKind::Sepia,
            Self::BlueYellow => EffectKind::BlueYellow,
            Self::Noise { .. } => EffectKind::Noise,
            Self::Colorize { .. } => EffectKind::Colorize,
            Self::Floodfill { .. } => EffectKind::Floodfill,
        }
    }

    /// Numeric parameters as (name, value) pairs.
    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        match *self {
            Self::Brightness { factor }
            | Self::Contrast { factor }
            | Self::Red { factor }
            | Self::Green { factor }
            | Self::Blue { factor } => vec![("factor", factor as f64)],
            Self::Sepia { depth } => vec![("depth", depth as f64)],
            Self::Noise { ratio } => vec![("ratio", ratio)],
            _ => Vec::new(),
        }
    }

    /// Check parameters against their definitions. Called when the effect is
    /// about to be evaluated.
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind();
        let defs = kind.parameter_definitions();
        for (name, value) in self.parameters() {
            if let Some(def) = defs.iter().find(|def| def.name == name)
                && !def.param_type.accepts(value)
            {
                return Err(CoreError::InvalidParameter {
                    effect: kind.name(),
                    name,
                    value,
                    reason: "outside the parameter's range",
                });
            }
        }
        match self {
            Self::Colorize { palette } | Self::Floodfill { palette } => palette.validate(),
            _ => Ok(()),
        }
    }

    /// True if the parameters leave every pixel unchanged.
    pub fn is_identity(&self) -> bool {
        match *self {
            Self::Brightness { factor }
            | Self::Contrast { factor }
            | Self::Red { factor }
            | Self::Green { factor }
            | Self::Blue { factor } => factor == 0,
            Self::Noise { ratio } => ratio == 0.0,
            _ => false,
        }
    }

    /// Replace the palette of a palette-driven effect. Returns true if the
    /// effect uses a palette.
    pub fn set_palette(&mut self, new_palette: &Palette) -> bool {
        match self {
            Self::Colorize { palette } | Self::Floodfill { palette } => {
                *palette = new_palette.clone();
                true
            }
            _ => false,
        }
    }

    /// Apply this effect to one pixel. Floodfill has no per-pixel form and
    /// leaves the pixel unchanged; the pipeline routes it to the recolorer.
    pub fn apply_pixel<R: rand::Rng>(&self, rgb: Rgb, rng: &mut R) -> Rgb {
        match self {
            Self::Grey => transform::grey(rgb),
            Self::BlackWhite => transform::black_white(rgb),
            Self::Invert => transform::invert(rgb),
            Self::Brightness { factor } => transform::brightness(rgb, *factor),
            Self::Contrast { factor } => transform::contrast(rgb, *factor),
            Self::Red { factor } => transform::shift_channel(rgb, Channel::Red, *factor),
            Self::Green { factor } => transform::shift_channel(rgb, Channel::Green, *factor),
            Self::Blue { factor } => transform::shift_channel(rgb, Channel::Blue, *factor),
            Self::Sepia { depth } => transform::sepia(rgb, *depth),
            Self::BlueYellow => transform::blue_yellow(rgb),
            Self::Noise { ratio } => transform::noise(rgb, *ratio, rng),
            Self::Colorize { palette } => transform::colorize(rgb, palette),
            Self::Floodfill { .. } => rgb,
        }
    }
}

/// One entry of an effect chain. `effect: None` is a placeholder that the
/// pipeline skips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub id: Uuid,
    pub effect: Option<Effect>,
}

impl EffectSpec {
    pub fn new(effect: Effect) -> Self {
        Self {
            id: Uuid::new_v4(),
            effect: Some(effect),
        }
    }

    pub fn noop() -> Self {
        Self {
            id: Uuid::new_v4(),
            effect: None,
        }
    }
}

/// An ordered list of effects; each one sees the output of the previous.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectChain {
    specs: Vec<EffectSpec>,
}

#[derive(Serialize, Deserialize)]
struct ChainDocument {
    version: Version,
    effects: Vec<EffectSpec>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect and return its id.
    pub fn push(&mut self, effect: Effect) -> Uuid {
        let spec = EffectSpec::new(effect);
        let id = spec.id;
        self.specs.push(spec);
        id
    }

    /// Append an empty placeholder entry.
    pub fn push_noop(&mut self) -> Uuid {
        let spec = EffectSpec::noop();
        let id = spec.id;
        self.specs.push(spec);
        id
    }

    pub fn extend(&mut self, other: EffectChain) {
        self.specs.extend(other.specs);
    }

    /// Remove an entry by id. Returns true if found.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.specs.len();
        self.specs.retain(|spec| spec.id != id);
        self.specs.len() != before
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut EffectSpec> {
        self.specs.iter_mut().find(|spec| spec.id == id)
    }

    pub fn specs(&self) -> &[EffectSpec] {
        &self.specs
    }

    /// Number of entries, placeholders included.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Non-placeholder entries, in order.
    pub fn active(&self) -> impl Iterator<Item = &Effect> {
        self.specs.iter().filter_map(|spec| spec.effect.as_ref())
    }

    pub fn to_json(&self) -> Result<String> {
        let doc = ChainDocument {
            version: CURRENT_CHAIN_VERSION,
            effects: self.specs.clone(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ChainDocument = serde_json::from_str(json)?;
        if doc.version.major != CURRENT_CHAIN_VERSION.major {
            return Err(CoreError::IncompatibleVersion {
                found: doc.version,
                supported: CURRENT_CHAIN_VERSION,
            });
        }
        Ok(Self { specs: doc.effects })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl FromIterator<Effect> for EffectChain {
    fn from_iter<I: IntoIterator<Item = Effect>>(iter: I) -> Self {
        Self {
            specs: iter.into_iter().map(EffectSpec::new).collect(),
        }
    }
}

impl From<Effect> for EffectChain {
    fn from(effect: Effect) -> Self {
        std::iter::once(effect).collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn params(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn test_from_kind_params_defaults() {
        let sepia = Effect::from_kind_params(EffectKind::Sepia, &[]).unwrap();
        assert_eq!(sepia, Effect::Sepia { depth: 25 });
        let noise = Effect::from_kind_params(EffectKind::Noise, &[]).unwrap();
        assert_eq!(noise, Effect::Noise { ratio: 0.5 });
        let brightness = Effect::from_kind_params(EffectKind::Brightness, &[]).unwrap();
        assert!(brightness.is_identity());
    }

    #[test]
    fn test_from_kind_params_sets_values() {
        let effect =
            Effect::from_kind_params(EffectKind::Contrast, &params(&[("factor", 40.0)])).unwrap();
        assert_eq!(effect, Effect::Contrast { factor: 40 });
    }

    #[test]
    fn test_from_kind_params_unknown_param() {
        let err = Effect::from_kind_params(EffectKind::Grey, &params(&[("factor", 1.0)]))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownParameter { effect: "grey", .. }));
    }

    #[test]
    fn test_from_kind_params_out_of_range() {
        let err = Effect::from_kind_params(EffectKind::Contrast, &params(&[("factor", 259.0)]))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidParameter {
                effect: "contrast",
                name: "factor",
                ..
            }
        ));
        assert!(
            Effect::from_kind_params(EffectKind::Brightness, &params(&[("factor", 1.5)])).is_err()
        );
    }

    #[test]
    fn test_validate_contrast_pole() {
        assert!(Effect::Contrast { factor: 258 }.validate().is_ok());
        assert!(Effect::Contrast { factor: -258 }.validate().is_ok());
        assert!(Effect::Contrast { factor: 259 }.validate().is_err());
        assert!(Effect::Contrast { factor: 400 }.validate().is_err());
    }

    #[test]
    fn test_validate_noise_ratio() {
        assert!(Effect::Noise { ratio: f64::NAN }.validate().is_err());
        assert!(Effect::Noise { ratio: -0.1 }.validate().is_err());
        assert!(Effect::Noise { ratio: 1.0 }.validate().is_ok());
    }

    #[test]
    fn test_apply_pixel_saturates_unvalidated_factors() {
        let mut rng = StdRng::seed_from_u64(0);
        let px = [10, 20, 30];
        assert_eq!(Effect::Red { factor: i32::MAX }.apply_pixel(px, &mut rng), [255, 20, 30]);
        assert_eq!(Effect::Blue { factor: i32::MIN }.apply_pixel(px, &mut rng), [10, 20, 0]);
        assert_eq!(Effect::Sepia { depth: i32::MAX }.apply_pixel(px, &mut rng), [255, 255, 20]);
        assert_eq!(Effect::Brightness { factor: i32::MIN }.apply_pixel(px, &mut rng), [0, 0, 0]);
    }

    #[test]
    fn test_validate_palette() {
        let short: Palette = serde_json::from_str("[[1,2,3]]").unwrap();
        assert!(Effect::Floodfill { palette: short }.validate().is_err());
    }

    #[test]
    fn test_kind_name_roundtrip() {
        for kind in EffectKind::all_builtin() {
            assert_eq!(EffectKind::from_name(kind.name()).unwrap(), kind);
        }
        assert!(matches!(
            EffectKind::from_name("blur"),
            Err(CoreError::UnknownEffect(_))
        ));
    }

    #[test]
    fn test_serde_tag_matches_kind_name() {
        for kind in EffectKind::all_builtin() {
            let effect = Effect::from_kind_params(kind, &[]).unwrap();
            let value = serde_json::to_value(&effect).unwrap();
            assert_eq!(value["kind"], kind.name());
        }
    }

    #[test]
    fn test_progress_axis() {
        assert_eq!(EffectKind::Floodfill.progress_axis(), ProgressAxis::Column);
        assert_eq!(EffectKind::Grey.progress_axis(), ProgressAxis::Row);
    }

    #[test]
    fn test_apply_pixel_dispatch() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Effect::Invert.apply_pixel([0, 10, 255], &mut rng), [255, 245, 0]);
        assert_eq!(
            Effect::Green { factor: 5 }.apply_pixel([0, 10, 255], &mut rng),
            [0, 15, 255]
        );
        let floodfill = Effect::Floodfill {
            palette: Palette::default(),
        };
        assert_eq!(floodfill.apply_pixel([1, 2, 3], &mut rng), [1, 2, 3]);
    }

    #[test]
    fn test_set_palette() {
        let palette = Palette::new(vec![[0, 0, 0], [9, 9, 9]]).unwrap();
        let mut effect = Effect::Colorize {
            palette: Palette::default(),
        };
        assert!(effect.set_palette(&palette));
        assert_eq!(effect, Effect::Colorize { palette });
        assert!(!Effect::Grey.set_palette(&Palette::default()));
    }

    #[test]
    fn test_chain_active_skips_placeholders() {
        let mut chain = EffectChain::new();
        chain.push(Effect::Grey);
        chain.push_noop();
        chain.push(Effect::Invert);
        assert_eq!(chain.len(), 3);
        let active: Vec<_> = chain.active().collect();
        assert_eq!(active, vec![&Effect::Grey, &Effect::Invert]);
    }

    #[test]
    fn test_chain_remove_and_get_mut() {
        let mut chain = EffectChain::new();
        let grey = chain.push(Effect::Grey);
        let sepia = chain.push(Effect::Sepia { depth: 10 });
        chain.get_mut(sepia).unwrap().effect = Some(Effect::Sepia { depth: 30 });
        assert!(chain.remove(grey));
        assert!(!chain.remove(grey));
        assert_eq!(chain.specs()[0].effect, Some(Effect::Sepia { depth: 30 }));
    }

    #[test]
    fn test_chain_json_roundtrip() {
        let mut chain: EffectChain = [Effect::Grey, Effect::Noise { ratio: 0.25 }]
            .into_iter()
            .collect();
        chain.push_noop();
        let json = chain.to_json().unwrap();
        assert_eq!(EffectChain::from_json(&json).unwrap(), chain);
    }

    #[test]
    fn test_chain_rejects_other_major_version() {
        let json = r#"{"version":"2.0.0","effects":[]}"#;
        assert!(matches!(
            EffectChain::from_json(json),
            Err(CoreError::IncompatibleVersion { .. })
        ));
        let minor = r#"{"version":"1.3.0","effects":[]}"#;
        assert!(EffectChain::from_json(minor).unwrap().is_empty());
    }

    #[test]
    fn test_chain_json_uses_defaults() {
        let json = r#"{"version":"1.0.0","effects":[
            {"id":"00000000-0000-0000-0000-000000000001","effect":{"kind":"sepia"}},
            {"id":"00000000-0000-0000-0000-000000000002","effect":null}
        ]}"#;
        let chain = EffectChain::from_json(json).unwrap();
        assert_eq!(chain.active().collect::<Vec<_>>(), vec![&Effect::Sepia { depth: 25 }]);
    }
}
