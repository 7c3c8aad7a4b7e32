//! Watermark placement calculations
//!
//! Page space has its origin at the bottom-left, units are points.

use rand::Rng;

/// Inset of the four corner stamps from both page edges
pub const CORNER_INSET: f64 = 100.0;

/// Two positions closer than this on both axes count as duplicates
pub const EXCLUSION_RADIUS: f64 = 50.0;

/// Number of unchecked random stamps added at maximum density
pub const RANDOM_STAMP_COUNT: usize = 15;

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }
}

/// Where a single watermark run is drawn, and how large
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampPosition {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl StampPosition {
    /// Whether `(x, y)` falls inside this position's exclusion box
    fn overlaps(&self, x: f64, y: f64) -> bool {
        (self.x - x).abs() < EXCLUSION_RADIUS && (self.y - y).abs() < EXCLUSION_RADIUS
    }
}

/// Watermark density level, always within `1..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Density(u8);

impl Density {
    pub const MIN: Density = Density(1);
    pub const MAX: Density = Density(5);

    /// Create a density level, returning `None` outside `1..=5`
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0).contains(&level).then_some(Density(level))
    }

    /// Create a density level, clamping into `1..=5`
    pub fn saturating(level: i64) -> Self {
        Density(level.clamp(Self::MIN.0 as i64, Self::MAX.0 as i64) as u8)
    }

    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for Density {
    fn default() -> Self {
        Density(3)
    }
}

/// Generate stamp positions for a page using the thread-local random source
pub fn generate_positions(page: PageGeometry, font_size: f64, density: Density) -> Vec<StampPosition> {
    generate_positions_with_rng(page, font_size, density, &mut rand::thread_rng())
}

/// Generate stamp positions for a page
///
/// The layout is built in layers:
/// - a center stamp at 1.5× size plus four corner stamps (always present)
/// - a grid overlay from density 2
/// - rising and falling diagonals from density 4
/// - fifteen randomly placed stamps at density 5
///
/// Grid and diagonal points are skipped when an earlier position lies within
/// [`EXCLUSION_RADIUS`] on both axes. The random layer is never filtered, and
/// it is the only part of the output that depends on `rng`.
pub fn generate_positions_with_rng<R: Rng + ?Sized>(
    page: PageGeometry,
    font_size: f64,
    density: Density,
    rng: &mut R,
) -> Vec<StampPosition> {
    let PageGeometry { width, height } = page;
    let level = density.level() as usize;

    let mut positions = vec![
        StampPosition { x: width / 2.0, y: height / 2.0, size: font_size * 1.5 },
        StampPosition { x: CORNER_INSET, y: height - CORNER_INSET, size: font_size },
        StampPosition { x: width - CORNER_INSET, y: height - CORNER_INSET, size: font_size },
        StampPosition { x: CORNER_INSET, y: CORNER_INSET, size: font_size },
        StampPosition { x: width - CORNER_INSET, y: CORNER_INSET, size: font_size },
    ];

    if level >= 2 {
        let grid = (level * 2).max(2);
        let step_x = width / grid as f64;
        let step_y = height / grid as f64;

        for row in 0..=grid {
            for col in 0..=grid {
                push_unique(&mut positions, step_x * col as f64, step_y * row as f64, font_size);
            }
        }
    }

    if level >= 4 {
        let count = level * 2;
        let step_x = width / count as f64;
        let step_y = height / count as f64;

        for i in 0..=count {
            push_unique(&mut positions, step_x * i as f64, step_y * i as f64, font_size);
        }
        for i in 0..=count {
            push_unique(&mut positions, step_x * i as f64, height - step_y * i as f64, font_size);
        }
    }

    if density == Density::MAX {
        for _ in 0..RANDOM_STAMP_COUNT {
            let x = rng.gen::<f64>() * width;
            let y = rng.gen::<f64>() * height;
            let size = font_size * (0.8 + 0.4 * rng.gen::<f64>());
            positions.push(StampPosition { x, y, size });
        }
    }

    positions
}

fn push_unique(positions: &mut Vec<StampPosition>, x: f64, y: f64, size: f64) {
    if !positions.iter().any(|p| p.overlaps(x, y)) {
        positions.push(StampPosition { x, y, size });
    }
}
