//! Static occupancy map with a precomputed obstacle distance field.
//!
//! The map is loaded once at startup and never modified. On load, a
//! distance field is propagated from all occupied cells via BFS so that
//! per-endpoint obstacle distance lookups are a single array read.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{Point2D, Pose2D};

/// Distances beyond this are clamped in the distance field (meters).
const MAX_FIELD_DIST: f64 = 2.0;

/// Cell encoding in map files.
const CELL_FREE: u8 = 0;
const CELL_OCCUPIED: u8 = 1;

/// Errors from loading or saving map files.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("map file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("map file parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("map cell payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("map dimensions {width}x{height} do not match {cells} cells")]
    DimensionMismatch {
        width: usize,
        height: usize,
        cells: usize,
    },

    #[error("map resolution must be positive, got {0}")]
    BadResolution(f64),

    #[error("map contains no free cells")]
    NoFreeSpace,
}

/// On-disk map format: JSON metadata with base64-encoded cells.
///
/// Cells are row-major, one byte each: 0 = free, 1 = occupied.
#[derive(Debug, Serialize, Deserialize)]
struct MapFile {
    resolution: f64,
    width: usize,
    height: usize,
    origin_x: f64,
    origin_y: f64,
    cells: String,
}

/// Occupancy map with obstacle distance field.
#[derive(Debug, Clone)]
pub struct OccupancyField {
    width: usize,
    height: usize,
    /// Meters per cell.
    resolution: f64,
    /// World coordinates of the bottom-left corner of cell (0, 0).
    origin_x: f64,
    origin_y: f64,
    /// Row-major occupancy, CELL_FREE or CELL_OCCUPIED.
    cells: Vec<u8>,
    /// Distance to nearest occupied cell, per cell (meters).
    distance_field: Vec<f64>,
    /// Linear indices of free cells, for uniform free-space sampling.
    free_indices: Vec<usize>,
}

impl OccupancyField {
    /// Build a field from raw cell data.
    pub fn from_cells(
        width: usize,
        height: usize,
        resolution: f64,
        origin_x: f64,
        origin_y: f64,
        cells: Vec<u8>,
    ) -> Result<Self, MapError> {
        if resolution <= 0.0 {
            return Err(MapError::BadResolution(resolution));
        }
        if cells.len() != width * height {
            return Err(MapError::DimensionMismatch {
                width,
                height,
                cells: cells.len(),
            });
        }

        let free_indices: Vec<usize> = cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == CELL_FREE)
            .map(|(i, _)| i)
            .collect();

        let mut field = Self {
            width,
            height,
            resolution,
            origin_x,
            origin_y,
            cells,
            distance_field: Vec::new(),
            free_indices,
        };
        field.compute_distance_field();
        Ok(field)
    }

    /// Load a map from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let map_file: MapFile = serde_json::from_reader(reader)?;

        let cells = BASE64.decode(&map_file.cells)?;
        Self::from_cells(
            map_file.width,
            map_file.height,
            map_file.resolution,
            map_file.origin_x,
            map_file.origin_y,
            cells,
        )
    }

    /// Save the map to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MapError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        let map_file = MapFile {
            resolution: self.resolution,
            width: self.width,
            height: self.height,
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            cells: BASE64.encode(&self.cells),
        };
        serde_json::to_writer(writer, &map_file)?;
        Ok(())
    }

    /// Get the grid dimensions in cells.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the resolution in meters per cell.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Get the world coordinates of the grid origin.
    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    /// Number of free cells in the map.
    pub fn free_cell_count(&self) -> usize {
        self.free_indices.len()
    }

    /// Convert world coordinates to cell indices.
    ///
    /// Returns `None` when the position is outside the grid.
    pub fn world_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let cx = ((x - self.origin_x) / self.resolution).floor();
        let cy = ((y - self.origin_y) / self.resolution).floor();

        if cx >= 0.0 && cy >= 0.0 {
            let cx = cx as usize;
            let cy = cy as usize;
            if cx < self.width && cy < self.height {
                return Some((cx, cy));
            }
        }
        None
    }

    /// World coordinates of the center of a cell.
    pub fn cell_to_world(&self, cx: usize, cy: usize) -> (f64, f64) {
        (
            self.origin_x + (cx as f64 + 0.5) * self.resolution,
            self.origin_y + (cy as f64 + 0.5) * self.resolution,
        )
    }

    /// Whether the world position falls on a free cell.
    ///
    /// Positions outside the grid are not free.
    pub fn is_free(&self, x: f64, y: f64) -> bool {
        match self.world_to_cell(x, y) {
            Some((cx, cy)) => self.cells[cy * self.width + cx] == CELL_FREE,
            None => false,
        }
    }

    /// Distance from a world position to the nearest occupied cell.
    ///
    /// Positions outside the grid return the clamp distance.
    pub fn nearest_obstacle_distance(&self, point: &Point2D) -> f64 {
        match self.world_to_cell(point.x, point.y) {
            Some((cx, cy)) => self.distance_field[cy * self.width + cx],
            None => MAX_FIELD_DIST,
        }
    }

    /// Obstacle distance for a batch of world points.
    pub fn nearest_obstacle_distances(&self, points: &[Point2D]) -> Vec<f64> {
        points
            .iter()
            .map(|p| self.nearest_obstacle_distance(p))
            .collect()
    }

    /// Distance at a cell (for debugging and tests).
    pub fn distance_at_cell(&self, cx: usize, cy: usize) -> f64 {
        if cx < self.width && cy < self.height {
            self.distance_field[cy * self.width + cx]
        } else {
            MAX_FIELD_DIST
        }
    }

    /// Sample a pose uniformly over the free cells, with uniform heading.
    pub fn sample_free_pose<R: Rng>(&self, rng: &mut R) -> Result<Pose2D, MapError> {
        if self.free_indices.is_empty() {
            return Err(MapError::NoFreeSpace);
        }
        let idx = self.free_indices[rng.gen_range(0..self.free_indices.len())];
        let cx = idx % self.width;
        let cy = idx / self.width;
        let (x, y) = self.cell_to_world(cx, cy);
        let theta = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
        Ok(Pose2D::new(x, y, theta))
    }

    /// Compute the distance field from occupied cells using BFS.
    ///
    /// 8-connected propagation with diagonal steps weighing sqrt(2)
    /// cells, clamped at MAX_FIELD_DIST.
    fn compute_distance_field(&mut self) {
        self.distance_field = vec![MAX_FIELD_DIST; self.width * self.height];

        let mut queue: VecDeque<(usize, usize, f64)> = VecDeque::new();

        for cy in 0..self.height {
            for cx in 0..self.width {
                if self.cells[cy * self.width + cx] == CELL_OCCUPIED {
                    self.distance_field[cy * self.width + cx] = 0.0;
                    queue.push_back((cx, cy, 0.0));
                }
            }
        }

        let neighbors: [(i32, i32, f64); 8] = [
            (-1, 0, 1.0),
            (1, 0, 1.0),
            (0, -1, 1.0),
            (0, 1, 1.0),
            (-1, -1, std::f64::consts::SQRT_2),
            (1, -1, std::f64::consts::SQRT_2),
            (-1, 1, std::f64::consts::SQRT_2),
            (1, 1, std::f64::consts::SQRT_2),
        ];

        while let Some((cx, cy, dist)) = queue.pop_front() {
            // Skip entries superseded by a shorter path
            if dist > self.distance_field[cy * self.width + cx] + 1e-6 {
                continue;
            }

            for &(dx, dy, step) in &neighbors {
                let nx = cx as i32 + dx;
                let ny = cy as i32 + dy;

                if nx >= 0 && ny >= 0 && (nx as usize) < self.width && (ny as usize) < self.height {
                    let nx = nx as usize;
                    let ny = ny as usize;
                    let new_dist = dist + step * self.resolution;

                    if new_dist < self.distance_field[ny * self.width + nx]
                        && new_dist < MAX_FIELD_DIST
                    {
                        self.distance_field[ny * self.width + nx] = new_dist;
                        queue.push_back((nx, ny, new_dist));
                    }
                }
            }
        }
    }
}
