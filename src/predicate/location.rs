//! Location predicates: proximity to the door, axis-aligned boxes and
//! named regions.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::{args, complete, EvalContext, Predicate, PredicateError};
use crate::core::types::{BlockPos, Tri};

/// Largest accepted half extent of a proximity form
pub const MAX_PROXIMITY: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximityForm {
    #[default]
    Cuboid,
    Ellipsoid,
    Cylinder,
}

impl ProximityForm {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cuboid" => Some(ProximityForm::Cuboid),
            "ellipsoid" => Some(ProximityForm::Ellipsoid),
            "cylinder" => Some(ProximityForm::Cylinder),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProximityForm::Cuboid => "cuboid",
            ProximityForm::Ellipsoid => "ellipsoid",
            ProximityForm::Cylinder => "cylinder",
        }
    }

    /// True if `point` lies within the form centred on `center`
    pub fn contains(self, center: DVec3, point: DVec3, dimensions: DVec3) -> bool {
        let d = point - center;
        match self {
            ProximityForm::Cuboid => {
                d.x.abs() <= dimensions.x && d.y.abs() <= dimensions.y && d.z.abs() <= dimensions.z
            }
            ProximityForm::Ellipsoid => (d / dimensions).length_squared() <= 1.0,
            ProximityForm::Cylinder => {
                if d.y.abs() > dimensions.y {
                    return false;
                }
                let nx = d.x / dimensions.x;
                let nz = d.z / dimensions.z;
                nx * nx + nz * nz <= 1.0
            }
        }
    }
}

/// Opens the door while the actor is close to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proximity {
    /// Half extents along each axis
    pub dimensions: DVec3,
    #[serde(default)]
    pub form: ProximityForm,
}

impl Proximity {
    pub fn new(dimensions: DVec3, form: ProximityForm) -> Self {
        Self { dimensions, form }
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        let Some(actor) = ctx.actor else {
            return Tri::Abstain;
        };
        if actor.world != ctx.door.world {
            return Tri::False;
        }
        let block = BlockPos::containing(actor.position).as_dvec3();
        Tri::from_bool(self.form.contains(ctx.door.position, block, self.dimensions))
    }

    pub(super) fn describe(&self) -> String {
        format!(
            "within {} of {:.1}/{:.1}/{:.1}",
            self.form.name(),
            self.dimensions.x,
            self.dimensions.y,
            self.dimensions.z
        )
    }
}

/// Opens the door while the actor stands inside a box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRegion {
    pub world: String,
    pub min: BlockPos,
    pub max: BlockPos,
}

impl SimpleRegion {
    /// Build a region from two opposite corners in any order
    pub fn new(world: impl Into<String>, a: BlockPos, b: BlockPos) -> Self {
        Self {
            world: world.into(),
            min: a.min(&b),
            max: a.max(&b),
        }
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        let Some(actor) = ctx.actor else {
            return Tri::Abstain;
        };
        if actor.world != self.world {
            return Tri::False;
        }
        Tri::from_bool(self.contains(BlockPos::containing(actor.position)))
    }

    pub(super) fn describe(&self) -> String {
        format!(
            "inside {} {},{},{} to {},{},{}",
            self.world, self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

/// Opens the door while the actor is inside a region managed by the
/// region integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMember {
    pub world: String,
    pub region: String,
}

impl RegionMember {
    pub fn new(world: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            world: world.into(),
            region: region.into(),
        }
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        let Some(actor) = ctx.actor else {
            return Tri::Abstain;
        };
        let Some(regions) = ctx.services.integrations.regions else {
            tracing::warn!(
                "Region predicate on {} needs a region integration, abstaining",
                ctx.door.id
            );
            return Tri::Abstain;
        };
        if actor.world != self.world {
            return Tri::False;
        }
        Tri::from_option(regions.contains(&self.world, &self.region, actor.position))
    }

    pub(super) fn describe(&self) -> String {
        format!("inside region {} in {}", self.region, self.world)
    }
}

pub(super) fn proximity_from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let raw = args::required(args, 0, "size")?;
    let dimensions = if raw.contains(',') {
        args::vector(raw, "size")?
    } else {
        DVec3::splat(args::number(raw, "size")?)
    };
    for value in dimensions.to_array() {
        args::in_range(value, 1.0, MAX_PROXIMITY, "size")?;
    }

    let form = match args.get(1) {
        None => ProximityForm::Cuboid,
        Some(s) => ProximityForm::parse(s).ok_or_else(|| PredicateError::InvalidArgument {
            name: "form",
            value: s.to_string(),
        })?,
    };
    Ok(Predicate::Proximity(Proximity::new(dimensions, form)))
}

pub(super) fn proximity_completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, _) => complete::hint("size or x,y,z"),
        (1, current) => complete::options(current, &["cuboid", "ellipsoid", "cylinder"]),
        _ => Vec::new(),
    }
}

pub(super) fn simple_region_from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let world = args::required(args, 0, "world")?;
    let first = args::block(args::required(args, 1, "first corner")?, "first corner")?;
    let second = args::block(args::required(args, 2, "second corner")?, "second corner")?;
    Ok(Predicate::SimpleRegion(SimpleRegion::new(world, first, second)))
}

pub(super) fn simple_region_completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, _) => complete::hint("world"),
        (1, _) => complete::hint("x1,y1,z1"),
        (2, _) => complete::hint("x2,y2,z2"),
        _ => Vec::new(),
    }
}

pub(super) fn region_from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let world = args::required(args, 0, "world")?;
    let region = args::required(args, 1, "region")?;
    Ok(Predicate::Region(RegionMember::new(world, region)))
}

pub(super) fn region_completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, _) => complete::hint("world"),
        (1, _) => complete::hint("region id"),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: DVec3 = DVec3::new(0.0, 64.0, 0.0);

    #[test]
    fn test_cuboid_is_per_axis() {
        let dims = DVec3::new(3.0, 2.0, 3.0);
        assert!(ProximityForm::Cuboid.contains(CENTER, DVec3::new(3.0, 66.0, -3.0), dims));
        assert!(!ProximityForm::Cuboid.contains(CENTER, DVec3::new(3.0, 67.0, 0.0), dims));
    }

    #[test]
    fn test_ellipsoid_excludes_corners() {
        let dims = DVec3::splat(3.0);
        assert!(ProximityForm::Ellipsoid.contains(CENTER, DVec3::new(3.0, 64.0, 0.0), dims));
        assert!(!ProximityForm::Ellipsoid.contains(CENTER, DVec3::new(3.0, 66.0, 3.0), dims));
    }

    #[test]
    fn test_cylinder_bounds_height_separately() {
        let dims = DVec3::new(2.0, 10.0, 2.0);
        assert!(ProximityForm::Cylinder.contains(CENTER, DVec3::new(1.0, 73.0, 1.0), dims));
        assert!(!ProximityForm::Cylinder.contains(CENTER, DVec3::new(2.0, 64.0, 2.0), dims));
        assert!(!ProximityForm::Cylinder.contains(CENTER, DVec3::new(0.0, 75.0, 0.0), dims));
    }

    #[test]
    fn test_simple_region_normalises_corners() {
        let region = SimpleRegion::new("world", BlockPos::new(10, 80, -5), BlockPos::new(0, 60, 5));
        assert_eq!(region.min, BlockPos::new(0, 60, -5));
        assert_eq!(region.max, BlockPos::new(10, 80, 5));
        assert!(region.contains(BlockPos::new(10, 60, 0)));
        assert!(!region.contains(BlockPos::new(11, 60, 0)));
    }

    #[test]
    fn test_proximity_args() {
        let predicate = proximity_from_args(&["5"]).unwrap();
        match predicate {
            Predicate::Proximity(p) => {
                assert_eq!(p.dimensions, DVec3::splat(5.0));
                assert_eq!(p.form, ProximityForm::Cuboid);
            }
            other => panic!("unexpected predicate {:?}", other),
        }

        let predicate = proximity_from_args(&["2,4,2", "cylinder"]).unwrap();
        assert!(matches!(
            predicate,
            Predicate::Proximity(Proximity { form: ProximityForm::Cylinder, .. })
        ));

        assert!(matches!(
            proximity_from_args(&["101"]),
            Err(PredicateError::OutOfRange { .. })
        ));
        assert!(proximity_from_args(&["0.5"]).is_err());
        assert!(proximity_from_args(&["5", "sphere"]).is_err());
    }

    #[test]
    fn test_simple_region_args() {
        let predicate = simple_region_from_args(&["world", "1,2,3", "-1,5,0"]).unwrap();
        match predicate {
            Predicate::SimpleRegion(region) => {
                assert_eq!(region.min, BlockPos::new(-1, 2, 0));
                assert_eq!(region.max, BlockPos::new(1, 5, 3));
            }
            other => panic!("unexpected predicate {:?}", other),
        }
        assert!(simple_region_from_args(&["world", "1,2,3"]).is_err());
    }
}
