/// Corner found on one pyramid level, in that level's pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredKeypoint {
    pub x: f32,
    pub y: f32,
    pub response: f32,
}

/// Scale information for pyramid levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    pub scale: f32,
    pub width: usize,
    pub height: usize,
}
