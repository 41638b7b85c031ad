/// Options that control how a patch is filled and post-processed.
///
/// ```
/// use quadfill::Config;
///
/// let config = Config::default()
///     .with_smoothing_iterations(10)
///     .with_snap_enabled(false);
/// assert_eq!(config.smoothing_iterations, 10);
/// assert!(!config.snap_enabled);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Number of Laplacian iterations per smoothing pass.
    pub smoothing_iterations: usize,
    /// Relaxation factor in [0, 1].
    pub smoothing_factor: f64,
    /// Picks among the alternative topologies registered for the same
    /// pattern. Wraps around the number of available alternatives.
    pub alternative_topology_index: usize,
    /// Snap the generated vertices to the reference surface.
    pub snap_enabled: bool,
    /// Also snap the vertices of the input boundary.
    pub snap_boundary_enabled: bool,
    /// Include the vertices of the dividing lines in smoothing. They are
    /// snapped either way.
    pub smooth_preexisting_enabled: bool,
    /// The patch closes a tube. Vertices are snapped radially away from the
    /// tube axis instead of along the reference normal.
    pub tube_mode: bool,
    /// Size of one template grid unit, relative to the mean boundary segment
    /// length of the patch being filled.
    pub output_scale: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            smoothing_iterations: 5,
            smoothing_factor: 0.5,
            alternative_topology_index: 0,
            snap_enabled: true,
            snap_boundary_enabled: false,
            smooth_preexisting_enabled: true,
            tube_mode: false,
            output_scale: 1.0,
        }
    }
}

impl Config {
    pub fn with_smoothing_iterations(mut self, iterations: usize) -> Self {
        self.smoothing_iterations = iterations;
        self
    }

    /// The factor is clamped to [0, 1].
    pub fn with_smoothing_factor(mut self, factor: f64) -> Self {
        self.smoothing_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn with_alternative_topology_index(mut self, index: usize) -> Self {
        self.alternative_topology_index = index;
        self
    }

    pub fn with_snap_enabled(mut self, flag: bool) -> Self {
        self.snap_enabled = flag;
        self
    }

    pub fn with_snap_boundary_enabled(mut self, flag: bool) -> Self {
        self.snap_boundary_enabled = flag;
        self
    }

    pub fn with_smooth_preexisting_enabled(mut self, flag: bool) -> Self {
        self.smooth_preexisting_enabled = flag;
        self
    }

    pub fn with_tube_mode(mut self, flag: bool) -> Self {
        self.tube_mode = flag;
        self
    }

    pub fn with_output_scale(mut self, scale: f64) -> Self {
        self.output_scale = scale;
        self
    }
}
