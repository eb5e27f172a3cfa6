// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quality indicators for Pareto fronts.
//!
//! Everything is computed in the scalar's distance space after re-orienting
//! coordinates as "improvement beyond the reference, clamped at zero", which
//! makes minimised and maximised axes uniform. Exact hypervolume uses the
//! HSO slicing recursion up to three dimensions and the WFG
//! exclusive-contribution recursion above that; a Monte-Carlo estimator is
//! available for wide fronts.

use alloc::vec::Vec;

use rand::Rng;

use skyline_index::{Coords, Distance, Error, Point, Result, Scalar, SpatialBackend};

use crate::front::FrontGeneric;

/// Nearest-neighbour distance statistics over a front's points.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DistanceStats<D> {
    /// Smallest nearest-neighbour distance.
    pub min: D,
    /// Mean nearest-neighbour distance.
    pub mean: D,
    /// Standard deviation of the nearest-neighbour distances.
    pub std_dev: D,
}

/// Cached indicator values, keyed by the front's mutation counter.
#[derive(Clone)]
pub(crate) struct IndicatorCache<T: Scalar, C: Coords<T>> {
    pub(crate) generation: u64,
    pub(crate) hypervolume: Option<(Point<T, C>, T::Dist)>,
    pub(crate) uniformity: Option<DistanceStats<T::Dist>>,
}

impl<T: Scalar, C: Coords<T>> Default for IndicatorCache<T, C> {
    fn default() -> Self {
        Self {
            generation: 0,
            hypervolume: None,
            uniformity: None,
        }
    }
}

impl<T, C, V, B> FrontGeneric<T, C, V, B>
where
    T: Scalar,
    C: Coords<T>,
    B: SpatialBackend<T, C>,
{
    /// Every front point as its improvement beyond `reference`, axis by
    /// axis, clamped at zero.
    fn oriented(&self, reference: &Point<T, C>) -> Vec<Vec<T::Dist>> {
        self.iter()
            .map(|(_, p, _)| {
                self.direction()
                    .iter()
                    .enumerate()
                    .map(|(axis, &minimise)| {
                        let v = if minimise {
                            reference.get(axis).to_dist() - p.get(axis).to_dist()
                        } else {
                            p.get(axis).to_dist() - reference.get(axis).to_dist()
                        };
                        v.max(T::Dist::zero())
                    })
                    .collect()
            })
            .collect()
    }

    /// Exact hypervolume dominated by the front up to `reference`.
    ///
    /// The value is cached per `(mutation counter, reference)`; repeated
    /// calls on an unchanged front are free.
    pub fn hypervolume(&self, reference: &Point<T, C>) -> Result<T::Dist> {
        self.check_dims(reference.dimensions())?;
        let generation = self.generation();
        {
            let cache = self.cache.borrow();
            if cache.generation == generation {
                if let Some((cached_ref, value)) = &cache.hypervolume {
                    if cached_ref == reference {
                        return Ok(*value);
                    }
                }
            }
        }

        let points = self.oriented(reference);
        let dims = self.dimensions();
        let value = if dims <= 3 {
            hso(points, dims)
        } else {
            wfg(&pareto_max(points))
        };

        let mut cache = self.cache.borrow_mut();
        if cache.generation != generation {
            *cache = IndicatorCache::default();
            cache.generation = generation;
        }
        cache.hypervolume = Some((reference.clone(), value));
        Ok(value)
    }

    /// Monte-Carlo hypervolume estimate from `samples` uniform draws.
    /// Returns the estimate and its 95% confidence half-width.
    pub fn hypervolume_mc<R: Rng>(
        &self,
        reference: &Point<T, C>,
        samples: usize,
        rng: &mut R,
    ) -> Result<(T::Dist, T::Dist)> {
        self.check_dims(reference.dimensions())?;
        if samples == 0 {
            return Err(Error::InvalidArgument("sampling requires samples >= 1"));
        }
        let points = self.oriented(reference);
        let dims = self.dimensions();
        if points.is_empty() || dims == 0 {
            return Ok((T::Dist::zero(), T::Dist::zero()));
        }

        let mut bounds = alloc::vec![T::Dist::zero(); dims];
        for p in &points {
            for (axis, &v) in p.iter().enumerate() {
                bounds[axis] = bounds[axis].max(v);
            }
        }
        let mut box_volume = T::Dist::one();
        for &b in &bounds {
            box_volume = box_volume * b;
        }
        if box_volume <= T::Dist::zero() {
            return Ok((T::Dist::zero(), T::Dist::zero()));
        }

        let mut sample = alloc::vec![T::Dist::zero(); dims];
        let mut hits = 0usize;
        for _ in 0..samples {
            for (axis, s) in sample.iter_mut().enumerate() {
                *s = T::Dist::from_f64(rng.gen::<f64>()) * bounds[axis];
            }
            let covered = points
                .iter()
                .any(|p| p.iter().zip(&sample).all(|(v, s)| v >= s));
            if covered {
                hits += 1;
            }
        }

        let ratio = T::Dist::from_usize(hits) / T::Dist::from_usize(samples);
        let estimate = ratio * box_volume;
        let variance = ratio * (T::Dist::one() - ratio) / T::Dist::from_usize(samples);
        let half_width = T::Dist::from_f64(1.96) * variance.sqrt() * box_volume;
        Ok((estimate, half_width))
    }

    fn check_reference_set(&self, reference: &[Point<T, C>]) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyContainer);
        }
        if reference.is_empty() {
            return Err(Error::InvalidArgument("reference set must be non-empty"));
        }
        for r in reference {
            self.check_dims(r.dimensions())?;
        }
        Ok(())
    }

    /// Generational distance: mean Euclidean distance from each front point
    /// to its nearest reference point.
    pub fn gd(&self, reference: &[Point<T, C>]) -> Result<T::Dist> {
        self.check_reference_set(reference)?;
        let mut sum = T::Dist::zero();
        for (_, p, _) in self.iter() {
            let mut best = T::Dist::infinity();
            for r in reference {
                best = best.min(p.distance(r));
            }
            sum = sum + best;
        }
        Ok(sum / T::Dist::from_usize(self.len()))
    }

    /// Inverted generational distance: mean Euclidean distance from each
    /// reference point to its nearest front point.
    pub fn igd(&self, reference: &[Point<T, C>]) -> Result<T::Dist> {
        self.check_reference_set(reference)?;
        let mut sum = T::Dist::zero();
        for r in reference {
            let mut best = T::Dist::infinity();
            for (_, p, _) in self.iter() {
                best = best.min(p.distance(r));
            }
            sum = sum + best;
        }
        Ok(sum / T::Dist::from_usize(reference.len()))
    }

    /// IGD⁺: as [`Self::igd`] but measuring distance to each front point's
    /// dominated hyperbox, so only shortfalls count.
    pub fn igd_plus(&self, reference: &[Point<T, C>]) -> Result<T::Dist> {
        self.check_reference_set(reference)?;
        let direction = self.direction();
        let mut sum = T::Dist::zero();
        for r in reference {
            let mut best = T::Dist::infinity();
            for (_, p, _) in self.iter() {
                best = best.min(p.distance_to_dominated_box(r, direction));
            }
            sum = sum + best;
        }
        Ok(sum / T::Dist::from_usize(reference.len()))
    }

    /// Additive ε-indicator: the smallest ε such that every reference point
    /// is weakly dominated by some front point translated by ε toward the
    /// worse side on every axis.
    pub fn epsilon(&self, reference: &[Point<T, C>]) -> Result<T::Dist> {
        self.check_reference_set(reference)?;
        let mut worst = T::Dist::zero();
        for r in reference {
            let mut best = T::Dist::infinity();
            for (_, p, _) in self.iter() {
                let mut needed = T::Dist::zero();
                for (axis, &minimise) in self.direction().iter().enumerate() {
                    let gap = if minimise {
                        p.get(axis).to_dist() - r.get(axis).to_dist()
                    } else {
                        r.get(axis).to_dist() - p.get(axis).to_dist()
                    };
                    needed = needed.max(gap);
                }
                best = best.min(needed);
            }
            worst = worst.max(best);
        }
        Ok(worst)
    }

    /// Nearest-neighbour distance statistics: how evenly the front covers
    /// its region. Cached per mutation counter.
    pub fn uniformity(&self) -> Result<DistanceStats<T::Dist>> {
        if self.len() < 2 {
            return Err(Error::InvalidArgument(
                "nearest-neighbour statistics need at least two elements",
            ));
        }
        let generation = self.generation();
        {
            let cache = self.cache.borrow();
            if cache.generation == generation {
                if let Some(stats) = cache.uniformity {
                    return Ok(stats);
                }
            }
        }

        let points: Vec<&Point<T, C>> = self.iter().map(|(_, p, _)| p).collect();
        let mut nn = Vec::with_capacity(points.len());
        for (i, p) in points.iter().enumerate() {
            let mut best = T::Dist::infinity();
            for (j, q) in points.iter().enumerate() {
                if i != j {
                    best = best.min(p.distance(q));
                }
            }
            nn.push(best);
        }
        let n = T::Dist::from_usize(nn.len());
        let mut min = T::Dist::infinity();
        let mut sum = T::Dist::zero();
        for &d in &nn {
            min = min.min(d);
            sum = sum + d;
        }
        let mean = sum / n;
        let mut var = T::Dist::zero();
        for &d in &nn {
            let dev = d - mean;
            var = var + dev * dev;
        }
        let stats = DistanceStats {
            min,
            mean,
            std_dev: (var / n).sqrt(),
        };

        let mut cache = self.cache.borrow_mut();
        if cache.generation != generation {
            *cache = IndicatorCache::default();
            cache.generation = generation;
        }
        cache.uniformity = Some(stats);
        Ok(stats)
    }

    /// Ratio of this front's size to another's.
    pub fn cardinality_ratio<V2, B2>(&self, other: &FrontGeneric<T, C, V2, B2>) -> T::Dist
    where
        B2: SpatialBackend<T, C>,
    {
        if other.is_empty() {
            return T::Dist::infinity();
        }
        T::Dist::from_usize(self.len()) / T::Dist::from_usize(other.len())
    }

    /// Coverage C-metric: the fraction of `other`'s points weakly dominated
    /// by some point of this front.
    pub fn c_metric<V2, B2>(&self, other: &FrontGeneric<T, C, V2, B2>) -> T::Dist
    where
        B2: SpatialBackend<T, C>,
    {
        if other.is_empty() {
            return T::Dist::zero();
        }
        let covered = other
            .iter()
            .filter(|(_, p, _)| self.dominates(p))
            .count();
        T::Dist::from_usize(covered) / T::Dist::from_usize(other.len())
    }

    /// Raw conflict between two objectives: the summed coordinate gap
    /// `|x_a - x_b|` over the front.
    pub fn conflict(&self, a: usize, b: usize) -> Result<T::Dist> {
        if a >= self.dimensions() || b >= self.dimensions() {
            return Err(Error::InvalidArgument("objective axis out of range"));
        }
        let mut sum = T::Dist::zero();
        for (_, p, _) in self.iter() {
            sum = sum + (p.get(a).to_dist() - p.get(b).to_dist()).abs();
        }
        Ok(sum)
    }

    /// Conflict after max-min normalising both objectives over the front's
    /// own range, averaged per element. 0 means the objectives agree on the
    /// stored points, 1 means they are fully opposed.
    pub fn normalized_conflict(&self, a: usize, b: usize) -> Result<T::Dist> {
        if a >= self.dimensions() || b >= self.dimensions() {
            return Err(Error::InvalidArgument("objective axis out of range"));
        }
        if self.is_empty() {
            return Ok(T::Dist::zero());
        }
        let axis_range = |axis: usize| {
            let mut lo = T::Dist::infinity();
            let mut hi = T::Dist::zero() - T::Dist::infinity();
            for (_, p, _) in self.iter() {
                let v = p.get(axis).to_dist();
                lo = lo.min(v);
                hi = hi.max(v);
            }
            (lo, hi - lo)
        };
        let (lo_a, range_a) = axis_range(a);
        let (lo_b, range_b) = axis_range(b);
        let normalise = |v: T::Dist, lo: T::Dist, range: T::Dist| {
            if range > T::Dist::zero() {
                (v - lo) / range
            } else {
                T::Dist::zero()
            }
        };
        let mut sum = T::Dist::zero();
        for (_, p, _) in self.iter() {
            let na = normalise(p.get(a).to_dist(), lo_a, range_a);
            let nb = normalise(p.get(b).to_dist(), lo_b, range_b);
            sum = sum + (na - nb).abs();
        }
        Ok(sum / T::Dist::from_usize(self.len()))
    }
}

/// 2D union-of-rectangles sweep: sort by width descending and stack heights.
fn sweep2<D: Distance>(mut points: Vec<(D, D)>) -> D {
    points.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(core::cmp::Ordering::Equal));
    let mut covered = D::zero();
    let mut total = D::zero();
    for (w, h) in points {
        if h > covered {
            total = total + w * (h - covered);
            covered = h;
        }
    }
    total
}

/// HSO: slice along the last axis and recurse on the projections of the
/// points whose boxes reach each slab.
pub(crate) fn hso<D: Distance>(mut points: Vec<Vec<D>>, dims: usize) -> D {
    match dims {
        0 => return D::zero(),
        1 => {
            let mut best = D::zero();
            for p in &points {
                best = best.max(p[0]);
            }
            return best;
        }
        2 => return sweep2(points.into_iter().map(|p| (p[0], p[1])).collect()),
        _ => {}
    }
    points.sort_by(|a, b| {
        b[dims - 1]
            .partial_cmp(&a[dims - 1])
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    let mut total = D::zero();
    for i in 0..points.len() {
        let top = points[i][dims - 1];
        let bottom = if i + 1 < points.len() {
            points[i + 1][dims - 1]
        } else {
            D::zero()
        };
        if top > bottom {
            let slab: Vec<Vec<D>> = points[..=i]
                .iter()
                .map(|p| p[..dims - 1].to_vec())
                .collect();
            total = total + hso(slab, dims - 1) * (top - bottom);
        }
    }
    total
}

/// WFG: sum each point's exclusive contribution, computed as its box volume
/// minus the hypervolume of the remaining points clipped into that box.
pub(crate) fn wfg<D: Distance>(points: &[Vec<D>]) -> D {
    let mut total = D::zero();
    for (i, p) in points.iter().enumerate() {
        let mut volume = D::one();
        for &v in p {
            volume = volume * v;
        }
        let limited: Vec<Vec<D>> = points[i + 1..]
            .iter()
            .map(|q| q.iter().zip(p).map(|(&a, &b)| a.min(b)).collect())
            .collect();
        total = total + volume - wfg(&pareto_max(limited));
    }
    total
}

/// Keep only the maximal points under elementwise ≥; exact duplicates keep
/// their first occurrence.
pub(crate) fn pareto_max<D: Distance>(points: Vec<Vec<D>>) -> Vec<Vec<D>> {
    let mut keep = Vec::new();
    'outer: for (i, p) in points.iter().enumerate() {
        for (j, q) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            let covers = q.iter().zip(p).all(|(a, b)| a >= b);
            if covers && (q != p || j < i) {
                continue 'outer;
            }
        }
        keep.push(p.clone());
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::Front;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use skyline_index::DynPoint;

    fn p2(x: f64, y: f64) -> DynPoint<f64> {
        DynPoint::from_slice(&[x, y])
    }

    fn small_front() -> Front<f64, u32> {
        let mut front: Front<f64, u32> = Front::new(2);
        front.insert(p2(1.0, 5.0), 0).unwrap();
        front.insert(p2(2.0, 2.0), 1).unwrap();
        front.insert(p2(3.0, 1.0), 2).unwrap();
        front
    }

    #[test]
    fn hypervolume_of_the_reference_scenario() {
        // {(1,5),(2,2),(3,1)} against (5,6) encloses 15 units
        let front = small_front();
        assert_eq!(front.hypervolume(&p2(5.0, 6.0)).unwrap(), 15.0);
        // cached second call agrees
        assert_eq!(front.hypervolume(&p2(5.0, 6.0)).unwrap(), 15.0);
    }

    #[test]
    fn hypervolume_never_drops_when_a_nondominated_point_joins() {
        let mut rng = SmallRng::seed_from_u64(11);
        let reference = p2(100.0, 100.0);
        let mut front: Front<f64, u32> = Front::new(2);
        let mut last = 0.0f64;
        for i in 0..200u32 {
            let p = p2(rng.gen_range(0..50) as f64, rng.gen_range(0..50) as f64);
            if front.insert(p, i).unwrap().is_inserted() {
                let hv = front.hypervolume(&reference).unwrap();
                assert!(hv >= last, "hypervolume dropped from {last} to {hv}");
                last = hv;
            }
        }
    }

    #[test]
    fn hso_and_wfg_agree_in_four_dimensions() {
        let mut rng = SmallRng::seed_from_u64(5);
        let points: alloc::vec::Vec<alloc::vec::Vec<f64>> = (0..24)
            .map(|_| (0..4).map(|_| rng.gen_range(1..20) as f64).collect())
            .collect();
        let exact = hso(points.clone(), 4);
        let via_wfg = wfg(&pareto_max(points));
        assert!(
            libm::fabs(exact - via_wfg) < 1e-6 * f64::max(exact, 1.0),
            "hso {exact} vs wfg {via_wfg}"
        );
    }

    #[test]
    fn monte_carlo_estimate_brackets_the_exact_value() {
        let front = small_front();
        let exact = front.hypervolume(&p2(5.0, 6.0)).unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        let (estimate, half_width) = front
            .hypervolume_mc(&p2(5.0, 6.0), 20_000, &mut rng)
            .unwrap();
        assert!(half_width > 0.0);
        assert!(
            libm::fabs(estimate - exact) < 3.0 * half_width,
            "estimate {estimate} too far from {exact} (half-width {half_width})"
        );
    }

    #[test]
    fn igd_family_against_a_reference_set() {
        let mut front: Front<f64, u32> = Front::new(2);
        front.insert(p2(1.0, 5.0), 0).unwrap();
        front.insert(p2(3.0, 1.0), 1).unwrap();
        let reference = [p2(1.0, 5.0), p2(2.0, 3.0), p2(3.0, 1.0)];

        // the middle reference point sits sqrt(5) from both front points
        let igd = front.igd(&reference).unwrap();
        assert!(libm::fabs(igd - libm::sqrt(5.0) / 3.0) < 1e-12);

        // IGD+ only counts shortfalls: (1,0) toward (3,1)
        let igd_plus = front.igd_plus(&reference).unwrap();
        assert!(libm::fabs(igd_plus - 1.0 / 3.0) < 1e-12);

        // every front point is in the reference set
        assert_eq!(front.gd(&reference).unwrap(), 0.0);

        // shifting (3,1) by 1 covers (2,3) on axis 0
        assert_eq!(front.epsilon(&reference).unwrap(), 1.0);
    }

    #[test]
    fn uniformity_statistics() {
        let mut front: Front<f64, u32> = Front::new(2);
        front.insert(p2(0.0, 3.0), 0).unwrap();
        front.insert(p2(1.0, 2.0), 1).unwrap();
        front.insert(p2(3.0, 0.0), 2).unwrap();
        let stats = front.uniformity().unwrap();
        let sqrt2 = core::f64::consts::SQRT_2;
        assert!(libm::fabs(stats.min - sqrt2) < 1e-12);
        assert!(libm::fabs(stats.mean - 4.0 * sqrt2 / 3.0) < 1e-12);
        assert!(libm::fabs(stats.std_dev - 2.0 / 3.0) < 1e-12);

        let mut lonely: Front<f64, u32> = Front::new(2);
        lonely.insert(p2(1.0, 1.0), 0).unwrap();
        assert!(lonely.uniformity().is_err());
    }

    #[test]
    fn coverage_and_cardinality() {
        let mut a: Front<f64, u32> = Front::new(2);
        a.insert(p2(1.0, 1.0), 0).unwrap();
        let mut b: Front<f64, u32> = Front::new(2);
        b.insert(p2(2.0, 2.0), 0).unwrap();
        b.insert(p2(0.0, 3.0), 1).unwrap();
        assert_eq!(a.c_metric(&b), 0.5);
        assert_eq!(b.c_metric(&a), 0.0);
        assert_eq!(a.cardinality_ratio(&b), 0.5);
    }

    #[test]
    fn conflict_between_objectives() {
        let mut front: Front<f64, u32> = Front::new(2);
        front.insert(p2(1.0, 5.0), 0).unwrap();
        front.insert(p2(3.0, 1.0), 1).unwrap();
        assert_eq!(front.conflict(0, 1).unwrap(), 6.0);
        // opposed ranks normalise to maximal conflict
        assert_eq!(front.normalized_conflict(0, 1).unwrap(), 1.0);
        assert!(front.conflict(0, 2).is_err());
    }
}
