use crate::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Traversal direction of a layout pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    LeftDown,
    RightDown,
    LeftUp,
    RightUp,
    /// Average of the four fixed directions
    #[default]
    Balanced,
}

impl Direction {
    /// The four directions combined by [`Direction::Balanced`], in merge order
    pub const FIXED: [Direction; 4] = [
        Direction::LeftDown,
        Direction::RightDown,
        Direction::LeftUp,
        Direction::RightUp,
    ];

    /// Nodes align with their successors and are flushed to the right of
    /// their column
    pub(crate) fn is_right(self) -> bool {
        matches!(self, Direction::RightDown | Direction::RightUp)
    }

    /// Alignment and compaction start from the bottom of each layer
    pub(crate) fn is_up(self) -> bool {
        matches!(self, Direction::LeftUp | Direction::RightUp)
    }
}

/// Which part of two aligned nodes is lined up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocketAlignment {
    /// Only align node tops
    None,
    /// Align sockets or tops depending on node heights
    #[default]
    Moderate,
    /// Always align connected sockets
    Full,
}

/// Immutable configuration for one layout invocation
///
/// Built with [`Settings::builder`] or deserialized; both paths validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SettingsBuilder", into = "SettingsBuilder")]
pub struct Settings {
    horizontal_spacing: f32,
    vertical_spacing: f32,
    direction: Direction,
    socket_alignment: SocketAlignment,
    iterations: usize,
    crossing_reduction_sweeps: usize,
    add_reroutes: bool,
    keep_reroutes_outside_frames: bool,
    stack_collapsed: bool,
    stack_margin_y_factor: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            horizontal_spacing: 50.0,
            vertical_spacing: 25.0,
            direction: Direction::Balanced,
            socket_alignment: SocketAlignment::Moderate,
            iterations: 20,
            crossing_reduction_sweeps: 24,
            add_reroutes: true,
            keep_reroutes_outside_frames: false,
            stack_collapsed: false,
            stack_margin_y_factor: 0.5,
        }
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Gap between consecutive layers
    pub fn horizontal_spacing(&self) -> f32 {
        self.horizontal_spacing
    }

    /// Gap between consecutive nodes of a layer
    pub fn vertical_spacing(&self) -> f32 {
        self.vertical_spacing
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn socket_alignment(&self) -> SocketAlignment {
        self.socket_alignment
    }

    /// Bound on rank refinement passes
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Bound on crossing reduction sweeps
    pub fn crossing_reduction_sweeps(&self) -> usize {
        self.crossing_reduction_sweeps
    }

    pub fn add_reroutes(&self) -> bool {
        self.add_reroutes
    }

    pub fn keep_reroutes_outside_frames(&self) -> bool {
        self.keep_reroutes_outside_frames
    }

    pub fn stack_collapsed(&self) -> bool {
        self.stack_collapsed
    }

    pub fn stack_margin_y_factor(&self) -> f32 {
        self.stack_margin_y_factor
    }
}

/// Builder for [`Settings`], also the serialized form of the settings
///
/// Missing fields take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsBuilder {
    horizontal_spacing: f32,
    vertical_spacing: f32,
    direction: Direction,
    socket_alignment: SocketAlignment,
    iterations: usize,
    crossing_reduction_sweeps: usize,
    add_reroutes: bool,
    keep_reroutes_outside_frames: bool,
    stack_collapsed: bool,
    stack_margin_y_factor: f32,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Settings::default().into()
    }
}

impl From<Settings> for SettingsBuilder {
    fn from(settings: Settings) -> Self {
        let Settings {
            horizontal_spacing,
            vertical_spacing,
            direction,
            socket_alignment,
            iterations,
            crossing_reduction_sweeps,
            add_reroutes,
            keep_reroutes_outside_frames,
            stack_collapsed,
            stack_margin_y_factor,
        } = settings;
        Self {
            horizontal_spacing,
            vertical_spacing,
            direction,
            socket_alignment,
            iterations,
            crossing_reduction_sweeps,
            add_reroutes,
            keep_reroutes_outside_frames,
            stack_collapsed,
            stack_margin_y_factor,
        }
    }
}

impl TryFrom<SettingsBuilder> for Settings {
    type Error = ConfigurationError;

    fn try_from(builder: SettingsBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

impl SettingsBuilder {
    pub fn horizontal_spacing(mut self, spacing: f32) -> Self {
        self.horizontal_spacing = spacing;
        self
    }

    pub fn vertical_spacing(mut self, spacing: f32) -> Self {
        self.vertical_spacing = spacing;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn socket_alignment(mut self, alignment: SocketAlignment) -> Self {
        self.socket_alignment = alignment;
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn crossing_reduction_sweeps(mut self, sweeps: usize) -> Self {
        self.crossing_reduction_sweeps = sweeps;
        self
    }

    pub fn add_reroutes(mut self, add: bool) -> Self {
        self.add_reroutes = add;
        self
    }

    pub fn keep_reroutes_outside_frames(mut self, keep: bool) -> Self {
        self.keep_reroutes_outside_frames = keep;
        self
    }

    pub fn stack_collapsed(mut self, stack: bool) -> Self {
        self.stack_collapsed = stack;
        self
    }

    pub fn stack_margin_y_factor(mut self, factor: f32) -> Self {
        self.stack_margin_y_factor = factor;
        self
    }

    /// Validate and freeze the settings
    ///
    /// # Errors
    /// Returns the first invalid option found
    pub fn build(self) -> Result<Settings, ConfigurationError> {
        for (name, value) in [
            ("horizontal_spacing", self.horizontal_spacing),
            ("vertical_spacing", self.vertical_spacing),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::Spacing { name, value });
            }
        }
        if self.iterations < 1 {
            return Err(ConfigurationError::Iterations(self.iterations));
        }
        if self.crossing_reduction_sweeps < 1 {
            return Err(ConfigurationError::CrossingReductionSweeps(
                self.crossing_reduction_sweeps,
            ));
        }
        if !(0.0..=1.0).contains(&self.stack_margin_y_factor) {
            return Err(ConfigurationError::StackMarginYFactor(
                self.stack_margin_y_factor,
            ));
        }

        Ok(Settings {
            horizontal_spacing: self.horizontal_spacing,
            vertical_spacing: self.vertical_spacing,
            direction: self.direction,
            socket_alignment: self.socket_alignment,
            iterations: self.iterations,
            crossing_reduction_sweeps: self.crossing_reduction_sweeps,
            add_reroutes: self.add_reroutes,
            keep_reroutes_outside_frames: self.keep_reroutes_outside_frames,
            stack_collapsed: self.stack_collapsed,
            stack_margin_y_factor: self.stack_margin_y_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::builder().build().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.direction(), Direction::Balanced);
        assert_eq!(settings.socket_alignment(), SocketAlignment::Moderate);
    }

    #[test]
    fn rejects_zero_budgets() {
        assert_eq!(
            Settings::builder().iterations(0).build(),
            Err(ConfigurationError::Iterations(0))
        );
        assert_eq!(
            Settings::builder().crossing_reduction_sweeps(0).build(),
            Err(ConfigurationError::CrossingReductionSweeps(0))
        );
    }

    #[test]
    fn rejects_stack_factor_out_of_range() {
        assert!(Settings::builder().stack_margin_y_factor(0.0).build().is_ok());
        assert!(Settings::builder().stack_margin_y_factor(1.0).build().is_ok());
        assert_eq!(
            Settings::builder().stack_margin_y_factor(1.5).build(),
            Err(ConfigurationError::StackMarginYFactor(1.5))
        );
        assert!(Settings::builder()
            .stack_margin_y_factor(f32::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn rejects_negative_spacing() {
        assert!(matches!(
            Settings::builder().vertical_spacing(-1.0).build(),
            Err(ConfigurationError::Spacing {
                name: "vertical_spacing",
                ..
            })
        ));
    }

    #[test]
    fn deserializes_partial_ron() {
        let settings: Settings = ron::from_str(
            "(direction: LEFT_UP, socket_alignment: FULL, crossing_reduction_sweeps: 4)",
        )
        .unwrap();
        assert_eq!(settings.direction(), Direction::LeftUp);
        assert_eq!(settings.socket_alignment(), SocketAlignment::Full);
        assert_eq!(settings.crossing_reduction_sweeps(), 4);
        assert_eq!(settings.horizontal_spacing(), 50.0);
    }

    #[test]
    fn deserialization_validates() {
        let result: Result<Settings, _> = ron::from_str("(iterations: 0)");
        assert!(result.is_err());
    }
}
