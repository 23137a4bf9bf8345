//! Area-of-effect targeting on the square grid
//!
//! Distances are measured in grid cells from a token's footprint centre.
//! Cones are approximated by their bounding square.

use serde::{Deserialize, Serialize};

use crate::domain::entities::Token;
use crate::domain::value_objects::TokenId;

/// Feet covered by one grid cell
pub const FEET_PER_CELL: f64 = 5.0;

/// Shape of an area effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AreaShape {
    #[default]
    Sphere,
    Emanation,
    Cylinder,
    Cube,
    Cone,
    Line,
    /// Anything the producer sent that we don't model; treated as a sphere
    #[serde(other)]
    Other,
}

impl AreaShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Emanation => "emanation",
            Self::Cylinder => "cylinder",
            Self::Cube => "cube",
            Self::Cone => "cone",
            Self::Line => "line",
            Self::Other => "area",
        }
    }
}

/// Direction a line effect travels from its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    #[default]
    East,
    West,
}

impl Direction {
    /// Unit step on the grid; north is -y
    fn step(&self) -> (f64, f64) {
        match self {
            Self::North => (0.0, -1.0),
            Self::South => (0.0, 1.0),
            Self::East => (1.0, 0.0),
            Self::West => (-1.0, 0.0),
        }
    }
}

/// Convert a distance in feet to grid cells
pub fn feet_to_cells(feet: u32) -> f64 {
    f64::from(feet) / FEET_PER_CELL
}

/// Geometry of one area effect in grid units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaTemplate {
    pub origin_x: f64,
    pub origin_y: f64,
    pub radius_cells: f64,
    pub shape: AreaShape,
    /// Full width of a line; ignored for other shapes
    pub width_cells: f64,
    pub direction: Direction,
}

impl AreaTemplate {
    pub fn new(origin_x: i32, origin_y: i32, radius_cells: f64, shape: AreaShape) -> Self {
        Self {
            origin_x: f64::from(origin_x),
            origin_y: f64::from(origin_y),
            radius_cells,
            shape,
            width_cells: 1.0,
            direction: Direction::default(),
        }
    }

    pub fn with_width(mut self, width_cells: f64) -> Self {
        self.width_cells = width_cells;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Whether a point (in cell coordinates) falls inside the area
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        match self.shape {
            AreaShape::Cube | AreaShape::Cone => dx.abs().max(dy.abs()) <= self.radius_cells,
            AreaShape::Line => {
                let (sx, sy) = self.direction.step();
                let forward = dx * sx + dy * sy;
                let perpendicular = (dx * sy - dy * sx).abs();
                forward >= 0.0
                    && forward <= self.radius_cells
                    && perpendicular <= self.width_cells / 2.0
            }
            AreaShape::Sphere | AreaShape::Emanation | AreaShape::Cylinder | AreaShape::Other => {
                (dx * dx + dy * dy).sqrt() <= self.radius_cells
            }
        }
    }
}

/// Select the tokens whose footprint centre lies inside the area
pub fn find_tokens_in_area<'a>(
    tokens: impl IntoIterator<Item = &'a Token>,
    area: &AreaTemplate,
) -> Vec<TokenId> {
    tokens
        .into_iter()
        .filter(|token| {
            let (x, y) = token.center();
            area.contains(x, y)
        })
        .map(|token| token.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_at(label: &str, x: i32, y: i32) -> Token {
        Token::new(label, x, y)
    }

    fn labels(tokens: &[Token], ids: &[TokenId]) -> Vec<String> {
        tokens
            .iter()
            .filter(|t| ids.contains(&t.id))
            .map(|t| t.label.clone())
            .collect()
    }

    #[test]
    fn test_sphere_uses_euclidean_distance() {
        let tokens = vec![
            token_at("near", 2, 0),
            token_at("far", 3, 0),
            token_at("diagonal", 2, 2),
        ];
        let area = AreaTemplate::new(0, 0, feet_to_cells(10), AreaShape::Sphere);
        let hit = find_tokens_in_area(&tokens, &area);
        assert_eq!(labels(&tokens, &hit), vec!["near"]);
    }

    #[test]
    fn test_cube_and_cone_use_chebyshev_bound() {
        let tokens = vec![token_at("corner", 2, 2), token_at("outside", 3, 1)];
        for shape in [AreaShape::Cube, AreaShape::Cone] {
            let area = AreaTemplate::new(0, 0, 2.0, shape);
            let hit = find_tokens_in_area(&tokens, &area);
            assert_eq!(labels(&tokens, &hit), vec!["corner"], "shape {:?}", shape);
        }
    }

    #[test]
    fn test_line_is_forward_only_within_half_width() {
        let tokens = vec![
            token_at("ahead", 4, 0),
            token_at("behind", -1, 0),
            token_at("beside", 2, 1),
            token_at("too_far", 7, 0),
        ];
        let area = AreaTemplate::new(0, 0, feet_to_cells(30), AreaShape::Line);
        let hit = find_tokens_in_area(&tokens, &area);
        assert_eq!(labels(&tokens, &hit), vec!["ahead"]);

        let wide = area.with_width(3.0);
        let hit = find_tokens_in_area(&tokens, &wide);
        assert_eq!(labels(&tokens, &hit), vec!["ahead", "beside"]);
    }

    #[test]
    fn test_line_respects_direction() {
        let tokens = vec![token_at("north", 0, -3), token_at("east", 3, 0)];
        let area = AreaTemplate::new(0, 0, 5.0, AreaShape::Line).with_direction(Direction::North);
        let hit = find_tokens_in_area(&tokens, &area);
        assert_eq!(labels(&tokens, &hit), vec!["north"]);
    }

    #[test]
    fn test_unknown_shape_falls_back_to_sphere() {
        let shape: AreaShape = serde_json::from_str("\"wall\"").unwrap();
        assert_eq!(shape, AreaShape::Other);
        let tokens = vec![token_at("edge", 2, 0), token_at("corner", 2, 2)];
        let area = AreaTemplate::new(0, 0, 2.0, shape);
        let hit = find_tokens_in_area(&tokens, &area);
        assert_eq!(labels(&tokens, &hit), vec!["edge"]);
    }

    #[test]
    fn test_large_token_measured_from_centre() {
        let mut ogre = token_at("ogre", 3, 0);
        ogre.size = 2;
        let tokens = vec![ogre];
        let area = AreaTemplate::new(0, 0, 3.5, AreaShape::Sphere);
        assert_eq!(find_tokens_in_area(&tokens, &area).len(), 1);
        let area = AreaTemplate::new(0, 0, 3.0, AreaShape::Sphere);
        assert!(find_tokens_in_area(&tokens, &area).is_empty());
    }
}
