//! §4.4 pass 4 / component table — incremental min/max over the
//! (lon, lat) pairs an augmented element carries.

use crate::model::Element;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub minlon: f64,
    pub maxlon: f64,
    pub minlat: f64,
    pub maxlat: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BoundsAccumulator {
    minlon: f64,
    maxlon: f64,
    minlat: f64,
    maxlat: f64,
    any: bool,
}

impl Default for BoundsAccumulator {
    fn default() -> Self {
        BoundsAccumulator {
            minlon: 180.0,
            maxlon: -180.0,
            minlat: 90.0,
            maxlat: -90.0,
            any: false,
        }
    }
}

impl BoundsAccumulator {
    pub fn add(&mut self, lon: f64, lat: f64) {
        self.any = true;
        if lon < self.minlon {
            self.minlon = lon;
        }
        if lon > self.maxlon {
            self.maxlon = lon;
        }
        if lat < self.minlat {
            self.minlat = lat;
        }
        if lat > self.maxlat {
            self.maxlat = lat;
        }
    }

    pub fn finish(self) -> Option<Bounds> {
        self.any.then_some(Bounds {
            minlon: self.minlon,
            maxlon: self.maxlon,
            minlat: self.minlat,
            maxlat: self.maxlat,
        })
    }
}

/// Every `(lon, lat)` an augmented element carries via its `<nd>`
/// descendants: a way's node refs, and a relation's node members plus its
/// way-member expansions. A bare node contributes nothing — it has no
/// `<nd>` children of its own (§3 Invariant 4).
pub fn collect_points(elem: &Element) -> Vec<(f64, f64)> {
    match elem {
        Element::Node(_) => Vec::new(),
        Element::Way(w) => w.nodes.iter().filter_map(|nd| nd.coord).collect(),
        Element::Relation(r) => r
            .members
            .iter()
            .flat_map(|m| {
                let mut pts = Vec::new();
                if let Some(c) = m.node_coord {
                    pts.push(c);
                }
                if let Some(exp) = &m.way_expansion {
                    pts.extend(exp.iter().copied());
                }
                pts
            })
            .collect(),
    }
}

pub fn bounds_for(elem: &Element) -> Option<Bounds> {
    let mut acc = BoundsAccumulator::default();
    for (lon, lat) in collect_points(elem) {
        acc.add(lon, lat);
    }
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{placeholder_metadata, NdRef, Way};

    #[test]
    fn way_with_no_resolved_nodes_has_no_bounds() {
        let way = Element::Way(Way {
            id: 1,
            version: 1,
            meta: placeholder_metadata(1),
            nodes: vec![NdRef::new(1)],
            tags: Vec::new(),
        });
        assert!(bounds_for(&way).is_none());
    }

    #[test]
    fn bounds_cover_all_points() {
        let mut nodes = vec![NdRef::new(1), NdRef::new(2)];
        nodes[0].coord = Some((10.0, 1.0));
        nodes[1].coord = Some((-5.0, -2.0));
        let way = Element::Way(Way {
            id: 1,
            version: 1,
            meta: placeholder_metadata(1),
            nodes,
            tags: Vec::new(),
        });
        let bounds = bounds_for(&way).unwrap();
        assert_eq!(bounds.minlon, -5.0);
        assert_eq!(bounds.maxlon, 10.0);
        assert_eq!(bounds.minlat, -2.0);
        assert_eq!(bounds.maxlat, 1.0);
    }
}
