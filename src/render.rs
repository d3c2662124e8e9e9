//! Drawing model output onto a render surface.

use crate::config;
use crate::error::RenderError;
use crate::image::{draw, Color, Image, Resolution};
use crate::landmark::{FrameAnnotations, MeshSubject, PoseSubject, SubjectInfo};
use crate::skeleton;

/// A 2D drawing surface that annotations are rendered onto.
///
/// The surface is expected to be overlaid on top of the video, so it is cleared to full
/// transparency.
pub trait RenderSurface {
    fn resolution(&self) -> Resolution;

    /// Resizes the surface, discarding its contents.
    fn resize(&mut self, res: Resolution) -> Result<(), RenderError>;

    /// Clears the whole surface.
    fn clear(&mut self) -> Result<(), RenderError>;

    fn fill_circle(
        &mut self,
        center: [f32; 2],
        radius: u32,
        color: Color,
    ) -> Result<(), RenderError>;

    fn line(
        &mut self,
        from: [f32; 2],
        to: [f32; 2],
        width: u32,
        color: Color,
    ) -> Result<(), RenderError>;

    /// Draws left-aligned text with its baseline at `pos`.
    fn text(&mut self, pos: [f32; 2], text: &str, color: Color) -> Result<(), RenderError>;
}

/// Coordinates are clamped to this distance from the origin before drawing.
///
/// Anything this far out is off-screen anyway, and the line and circle rasterizers overflow on
/// coordinates near the `i32` limits.
const MAX_COORD: f32 = (1 << 20) as f32;

/// Converts a position to pixel coordinates, or `None` if it is not a finite position.
fn pixel([x, y]: [f32; 2]) -> Option<(i32, i32)> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let clamp = |v: f32| v.round().clamp(-MAX_COORD, MAX_COORD) as i32;
    Some((clamp(x), clamp(y)))
}

impl RenderSurface for Image {
    fn resolution(&self) -> Resolution {
        Image::resolution(self)
    }

    fn resize(&mut self, res: Resolution) -> Result<(), RenderError> {
        Image::resize(self, res);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        Image::clear(self, Color::NULL);
        Ok(())
    }

    fn fill_circle(
        &mut self,
        center: [f32; 2],
        radius: u32,
        color: Color,
    ) -> Result<(), RenderError> {
        if let Some((x, y)) = pixel(center) {
            draw::circle(self, x, y, radius).color(color);
        }
        Ok(())
    }

    fn line(
        &mut self,
        from: [f32; 2],
        to: [f32; 2],
        width: u32,
        color: Color,
    ) -> Result<(), RenderError> {
        if let (Some((sx, sy)), Some((ex, ey))) = (pixel(from), pixel(to)) {
            draw::line(self, sx, sy, ex, ey)
                .color(color)
                .stroke_width(width);
        }
        Ok(())
    }

    fn text(&mut self, pos: [f32; 2], text: &str, color: Color) -> Result<(), RenderError> {
        if let Some((x, y)) = pixel(pos) {
            draw::text(self, x, y, text)
                .color(color)
                .align_left()
                .align_baseline();
        }
        Ok(())
    }
}

/// Colors, sizes and layout used by the [`AnnotationRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub mesh_color: Color,
    pub mesh_radius: u32,
    pub pose_point_color: Color,
    pub pose_point_radius: u32,
    pub pose_edge_color: Color,
    pub pose_edge_width: u32,
    /// Keypoints are drawn if their score is strictly greater than this.
    pub pose_score_threshold: f32,
    pub info_color: Color,
    pub info_origin: [f32; 2],
    pub info_line_height: f32,
    pub info_subject_spacing: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            mesh_color: Color::CYAN,
            mesh_radius: config::MESH_POINT_RADIUS,
            pose_point_color: Color::from_rgb8(0x22, 0xff, 0x47),
            pose_point_radius: config::POSE_POINT_RADIUS,
            pose_edge_color: Color::from_rgb8(0xff, 0x22, 0xc4),
            pose_edge_width: config::POSE_EDGE_WIDTH,
            pose_score_threshold: config::POSE_SCORE_THRESHOLD,
            info_color: Color::RED,
            info_origin: config::SUBJECT_INFO_ORIGIN,
            info_line_height: config::SUBJECT_INFO_LINE_HEIGHT,
            info_subject_spacing: config::SUBJECT_INFO_SPACING,
        }
    }
}

/// Draws face meshes, body skeletons and face attributes.
///
/// Every `draw_*` method does nothing when given `None` or an empty list. Rendering is
/// deterministic: the same input on a freshly cleared surface always produces the same output.
#[derive(Debug, Clone, Default)]
pub struct AnnotationRenderer {
    style: RenderStyle,
}

impl AnnotationRenderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    /// Clears `surface` and draws all annotations present in `annotations`.
    pub fn render<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        annotations: &FrameAnnotations,
    ) -> Result<(), RenderError> {
        surface.clear()?;
        self.draw_mesh(surface, annotations.mesh.as_deref())?;
        self.draw_pose(surface, annotations.pose.as_deref())?;
        self.draw_subject_info(surface, annotations.attributes.as_deref())?;
        Ok(())
    }

    /// Draws a dot for every landmark of every face. Landmarks are not connected.
    pub fn draw_mesh<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        subjects: Option<&[MeshSubject]>,
    ) -> Result<(), RenderError> {
        for subject in subjects.unwrap_or_default() {
            for &[x, y, _] in subject.keypoints() {
                surface.fill_circle([x, y], self.style.mesh_radius, self.style.mesh_color)?;
            }
        }
        Ok(())
    }

    /// Draws the skeleton of every body.
    ///
    /// Each keypoint scoring above the threshold gets a dot, plus a line to every keypoint it is
    /// connected to in [`skeleton::CONNECTIONS`]. The connected keypoint's own score is not
    /// checked, so a line can end at a keypoint that has no dot.
    pub fn draw_pose<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        subjects: Option<&[PoseSubject]>,
    ) -> Result<(), RenderError> {
        let style = &self.style;
        for subject in subjects.unwrap_or_default() {
            let keypoints = &subject.keypoints;
            let confident = keypoints
                .iter()
                .enumerate()
                .filter(|(_, kp)| kp.score > style.pose_score_threshold);
            for (i, kp) in confident {
                for connected in skeleton::connections(i) {
                    // Models with a smaller keypoint layout just don't get those edges.
                    let Some(other) = keypoints.get(connected.index()) else {
                        continue;
                    };
                    surface.line(
                        other.position(),
                        kp.position(),
                        style.pose_edge_width,
                        style.pose_edge_color,
                    )?;
                }

                surface.fill_circle(
                    kp.position(),
                    style.pose_point_radius,
                    style.pose_point_color,
                )?;
            }
        }
        Ok(())
    }

    /// Draws gender, age and expression of every face as a block of text lines.
    ///
    /// Blocks are stacked from the top-left corner in input order.
    pub fn draw_subject_info<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        subjects: Option<&[SubjectInfo]>,
    ) -> Result<(), RenderError> {
        let style = &self.style;
        let [x, y0] = style.info_origin;
        for (i, subject) in subjects.unwrap_or_default().iter().enumerate() {
            let y = y0 + style.info_subject_spacing * i as f32;
            let lines = [
                format!("gender: {}", subject.gender),
                format!("age: {}", round_age(subject.age)),
                format!("expression: {}", subject.expression),
            ];
            for (line, text) in lines.iter().enumerate() {
                let pos = [x, y + style.info_line_height * line as f32];
                surface.text(pos, text, style.info_color)?;
            }
        }
        Ok(())
    }
}

/// Rounds half-way cases up, towards positive infinity.
fn round_age(age: f32) -> i64 {
    (age + 0.5).floor() as i64
}
