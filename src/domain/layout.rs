//! Stacked subtree layout.
//!
//! Children are stacked vertically one column to the right of their parent and
//! centered on it. Any size or order change re-lays-out the changed node and
//! then every ancestor, because each ancestor's stack height depends on the
//! heights of its descendants.

use std::cmp::Reverse;

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::domain::arena::{Board, NodeId};
use crate::domain::error::DomainResult;

/// Geometry constants of the board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutMetrics {
    /// Width of a node box
    pub node_width: f64,
    /// Height of a bare title row; smallest height any box takes
    pub min_node_height: f64,
    /// Title row plus a square image
    pub max_node_height: f64,
    /// Gap between stacked boxes and between a node and its children column
    pub spacing: f64,
    /// Characters of summary text per line in a collapsed summary box
    pub chars_per_line: usize,
    pub line_height: f64,
    pub line_spacing: f64,
    /// Board extent in grid columns
    pub canvas_columns: u32,
    /// Board extent in grid rows
    pub canvas_rows: u32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        let node_width = 150.0;
        let min_node_height = 30.0;
        let max_node_height = min_node_height + node_width;
        let rows_per_max_height = 5.0;
        Self {
            node_width,
            min_node_height,
            max_node_height,
            spacing: (max_node_height - min_node_height * rows_per_max_height)
                / (rows_per_max_height - 1.0),
            chars_per_line: 20,
            line_height: 15.0,
            line_spacing: 3.0,
            canvas_columns: 100,
            canvas_rows: 400,
        }
    }
}

impl LayoutMetrics {
    /// Horizontal offset of a children column; also the grid column width.
    pub fn column_offset(&self) -> f64 {
        self.node_width + self.spacing
    }

    /// Grid row height.
    pub fn row_height(&self) -> f64 {
        self.min_node_height + self.spacing
    }

    pub fn canvas_size(&self) -> Size {
        Size::new(
            f64::from(self.canvas_columns) * self.column_offset(),
            f64::from(self.canvas_rows) * self.row_height(),
        )
    }

    pub fn canvas_center(&self) -> Point {
        let size = self.canvas_size();
        Point::new(size.width / 2.0, size.height / 2.0)
    }

    /// Replaces degenerate measurements (non-positive or non-finite).
    pub fn sanitize_height(&self, height: f64) -> f64 {
        if height.is_finite() && height > 0.0 {
            height
        } else {
            self.min_node_height
        }
    }

    /// Height of a collapsed summary box showing `text_len` characters.
    ///
    /// Rounded up to whole grid rows so that a single row equals
    /// `min_node_height` and stacked boxes line up with the grid.
    pub fn collapsed_summary_height(&self, text_len: usize) -> f64 {
        let per_line = self.chars_per_line.max(1) as f64;
        let lines = (text_len as f64 / per_line).ceil().max(1.0);
        let block = self.line_height * lines + self.line_spacing * (lines - 1.0);
        let clamped = block.clamp(self.min_node_height, self.max_node_height);
        let row = self.row_height();
        ((clamped + self.spacing) / row).ceil() * row - self.spacing
    }

    /// Vertical centers of a stack of boxes, first box at the largest offset.
    ///
    /// Returns the total stack height and one center per input height; the
    /// stack spans `[-total/2, total/2]`.
    pub fn stack(&self, heights: &[f64]) -> (f64, Vec<f64>) {
        if heights.is_empty() {
            return (0.0, Vec::new());
        }
        let total =
            heights.iter().sum::<f64>() + self.spacing * (heights.len() as f64 - 1.0);
        let mut offset = total / 2.0;
        let centers = heights
            .iter()
            .map(|&height| {
                let center = offset - height / 2.0;
                offset -= height + self.spacing;
                center
            })
            .collect();
        (total, centers)
    }

    /// Rounds each axis to the nearest grid line.
    pub fn snap_to_grid(&self, position: Point) -> Point {
        let column = self.column_offset();
        let row = self.row_height();
        Point::new(
            (position.x / column).round() * column,
            (position.y / row).round() * row,
        )
    }
}

impl Board {
    /// Height a child occupies in its parent's stack.
    pub fn effective_height(&self, id: NodeId) -> f64 {
        self.node(id)
            .map(|node| node.own_height.max(node.content_height()))
            .unwrap_or(0.0)
    }

    /// Lays out the direct children of `id` and refreshes its summary geometry.
    #[instrument(level = "trace", skip(self))]
    pub fn rearrange_children(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        let metrics = *self.metrics();
        let summary = self.summary_text(id);
        let collapsed_height = metrics.collapsed_summary_height(summary.chars().count());

        let mut children = self.children_of(id).to_vec();
        // stable: equal orders keep insertion order
        children.sort_by_key(|&child| Reverse(self.node(child).map_or(0, |n| n.order)));
        let heights: Vec<f64> = children
            .iter()
            .map(|&child| self.effective_height(child))
            .collect();
        let (total, centers) = metrics.stack(&heights);

        for (&child, &center) in children.iter().zip(&centers) {
            if let Some(node) = self.node_mut(child) {
                let slot = Point::new(metrics.column_offset(), center);
                node.local_position = slot;
                node.last_local_position = slot;
            }
        }

        let has_children = !children.is_empty();
        if let Some(list) = self.children_mut(id) {
            *list = children;
        }
        if let Some(node) = self.node_mut(id) {
            node.summary_text = summary;
            node.collapsed_summary_height = collapsed_height;
            node.subtree_content_height = if has_children {
                total
            } else {
                metrics.min_node_height
            };
            node.content_offset = Vec2::new(metrics.column_offset(), 0.0);
            trace!(
                subtree = node.subtree_content_height,
                collapsed = node.collapsed_summary_height,
                "rearranged"
            );
        }
    }

    /// Lays out `id` and then every ancestor up to its root.
    #[instrument(level = "trace", skip(self))]
    pub fn rearrange_self_and_parent(&mut self, id: NodeId) {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(node) = current {
            self.rearrange_children(node);
            steps += 1;
            if steps > self.len() {
                break;
            }
            current = self.parent_of(node);
        }
    }

    /// Stores a measured height; returns whether it changed.
    ///
    /// A node's own height only affects its parent's stack, so the re-layout
    /// starts at the parent.
    #[instrument(level = "debug", skip(self))]
    pub fn set_height(&mut self, id: NodeId, height: f64) -> DomainResult<bool> {
        let height = self.metrics().sanitize_height(height);
        let node = self.require_mut(id)?;
        if node.own_height == height {
            return Ok(false);
        }
        node.own_height = height;
        let parent = node.parent();
        if let Some(parent) = parent {
            self.rearrange_self_and_parent(parent);
        }
        Ok(true)
    }

    /// Flips the expanded flag; returns the new state.
    #[instrument(level = "debug", skip(self))]
    pub fn toggle_expand(&mut self, id: NodeId) -> DomainResult<bool> {
        let node = self.require_mut(id)?;
        node.is_expanded = !node.is_expanded;
        let expanded = node.is_expanded;
        self.rearrange_self_and_parent(id);
        Ok(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_metrics_then_grid_matches_box_sizes() {
        let metrics = LayoutMetrics::default();

        assert_eq!(metrics.spacing, 7.5);
        assert_eq!(metrics.column_offset(), 157.5);
        assert_eq!(metrics.row_height(), 37.5);
        assert_eq!(metrics.max_node_height, 180.0);
    }

    #[test]
    fn given_summary_lengths_when_computing_collapsed_height_then_whole_rows() {
        let metrics = LayoutMetrics::default();

        assert_eq!(metrics.collapsed_summary_height(0), 30.0);
        assert_eq!(metrics.collapsed_summary_height(20), 30.0);
        // 3 lines: 45 + 6 = 51 -> two rows
        assert_eq!(metrics.collapsed_summary_height(45), 67.5);
        assert_eq!(metrics.collapsed_summary_height(10_000), 180.0);
    }

    #[test]
    fn given_heights_when_stacking_then_span_is_centered() {
        let metrics = LayoutMetrics {
            spacing: 10.0,
            ..LayoutMetrics::default()
        };

        let (total, centers) = metrics.stack(&[140.0, 100.0]);

        assert_eq!(total, 250.0);
        assert_eq!(centers, vec![55.0, -75.0]);
    }

    #[test]
    fn given_degenerate_heights_when_sanitizing_then_minimum() {
        let metrics = LayoutMetrics::default();

        assert_eq!(metrics.sanitize_height(-3.0), 30.0);
        assert_eq!(metrics.sanitize_height(0.0), 30.0);
        assert_eq!(metrics.sanitize_height(f64::NAN), 30.0);
        assert_eq!(metrics.sanitize_height(f64::INFINITY), 30.0);
        assert_eq!(metrics.sanitize_height(42.0), 42.0);
    }

    #[test]
    fn given_off_grid_point_when_snapping_then_nearest_cell() {
        let metrics = LayoutMetrics::default();

        let snapped = metrics.snap_to_grid(Point::new(170.0, 50.0));

        assert_eq!(snapped, Point::new(157.5, 37.5));
    }
}
