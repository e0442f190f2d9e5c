//! Collision queries against world geometry.
//!
//! Movement and ballistics only ever ask one question: "what is the nearest
//! surface along this ray (or segment)?". [`CollisionQuery`] is that question;
//! the rendering engine that owns real meshes implements it on the client.
//! [`BoxWorld`] is an axis-aligned box implementation used by tests and
//! headless tooling.

use glam::Vec3;

use crate::game::participant::ParticipantId;

/// Segments shorter than this are treated as stationary
const MIN_SEGMENT: f32 = 1e-6;

/// What a ray struck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTag {
    /// Walkable geometry
    Ground,
    /// Vertical or blocking geometry
    Wall,
    /// A participant's hit-volume
    Player(ParticipantId),
    /// Projectiles, transient effects and weapon meshes
    Ignored,
}

impl SurfaceTag {
    /// Geometry that blocks movement and supports standing
    pub fn is_solid(&self) -> bool {
        matches!(self, SurfaceTag::Ground | SurfaceTag::Wall)
    }
}

/// Nearest intersection along a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub distance: f32,
    pub tag: SurfaceTag,
}

/// Which surfaces a query may report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFilter<'a> {
    /// Report participant hit-volumes at all
    pub include_players: bool,
    /// Never report this participant's hit-volume
    pub exclude_player: Option<ParticipantId>,
    /// Hit-volumes to look straight through
    pub skip_players: &'a [ParticipantId],
}

impl<'a> QueryFilter<'a> {
    /// Body movement: world geometry only
    pub const MOVEMENT: Self = Self {
        include_players: false,
        exclude_player: None,
        skip_players: &[],
    };

    /// Projectile flight: world and every participant except the shooter
    pub fn projectile(shooter: ParticipantId) -> Self {
        Self {
            include_players: true,
            exclude_player: Some(shooter),
            skip_players: &[],
        }
    }

    /// Same filter, also ignoring the listed hit-volumes
    pub fn skipping(self, ids: &'a [ParticipantId]) -> Self {
        Self {
            skip_players: ids,
            ..self
        }
    }

    pub fn accepts(&self, tag: &SurfaceTag) -> bool {
        match tag {
            SurfaceTag::Ignored => false,
            SurfaceTag::Ground | SurfaceTag::Wall => true,
            SurfaceTag::Player(id) => {
                self.include_players
                    && self.exclude_player != Some(*id)
                    && !self.skip_players.contains(id)
            }
        }
    }
}

/// Ray/segment oracle over world geometry
pub trait CollisionQuery {
    /// Nearest accepted surface within `max_distance` along a unit `direction`
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter<'_>,
    ) -> Option<RayHit>;

    /// Nearest accepted surface on the segment `from -> to`
    fn segment(&self, from: Vec3, to: Vec3, filter: &QueryFilter<'_>) -> Option<RayHit> {
        let delta = to - from;
        let length = delta.length();
        if length < MIN_SEGMENT {
            return None;
        }
        self.raycast(from, delta / length, length, filter)
    }
}

/// Axis-aligned box with a surface tag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub min: Vec3,
    pub max: Vec3,
    pub tag: SurfaceTag,
}

impl Brush {
    pub fn from_center(center: Vec3, half_extents: Vec3, tag: SurfaceTag) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
            tag,
        }
    }

    /// Entry distance of a ray into this box (slab method).
    /// Rays starting inside report zero.
    pub fn ray_entry(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

/// Collision world made of boxes
#[derive(Debug, Clone, Default)]
pub struct BoxWorld {
    brushes: Vec<Brush>,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a static box, returning its index
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3, tag: SurfaceTag) -> usize {
        self.brushes.push(Brush::from_center(center, half_extents, tag));
        self.brushes.len() - 1
    }

    /// Flat walkable slab whose top face sits at `height`
    pub fn add_floor(&mut self, height: f32, half_size: f32) -> usize {
        self.add_box(
            Vec3::new(0.0, height - 0.5, 0.0),
            Vec3::new(half_size, 0.5, half_size),
            SurfaceTag::Ground,
        )
    }

    /// Place or move a participant's hit-volume
    pub fn set_player_volume(&mut self, id: ParticipantId, center: Vec3, half_extents: Vec3) {
        let brush = Brush::from_center(center, half_extents, SurfaceTag::Player(id));
        match self
            .brushes
            .iter_mut()
            .find(|b| b.tag == SurfaceTag::Player(id))
        {
            Some(existing) => *existing = brush,
            None => self.brushes.push(brush),
        }
    }

    /// Remove a participant's hit-volume (death, disconnect)
    pub fn remove_player_volume(&mut self, id: ParticipantId) {
        self.brushes.retain(|b| b.tag != SurfaceTag::Player(id));
    }

    pub fn brushes(&self) -> &[Brush] {
        &self.brushes
    }
}

impl CollisionQuery for BoxWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter<'_>,
    ) -> Option<RayHit> {
        self.brushes
            .iter()
            .filter(|b| filter.accepts(&b.tag))
            .filter_map(|b| {
                b.ray_entry(origin, direction)
                    .filter(|t| *t <= max_distance)
                    .map(|t| (t, b.tag))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(distance, tag)| RayHit {
                point: origin + direction * distance,
                distance,
                tag,
            })
    }
}
