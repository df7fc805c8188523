// merge.rs - Droplet coalescence
//
// Pairwise O(n^2) check. n is bounded by `max_active_droplets`, which is in
// turn capped by `DROPLET_LIMIT`; a spatial grid would be the next step for
// larger swarms.

use super::{Droplet, MergeEvent};

/// Merge every pair closer than `factor * (r1 + r2)`. The larger droplet
/// absorbs the smaller, which is flagged dead for the end-of-step purge.
pub fn coalesce(drops: &mut [Droplet], factor: f32, merges: &mut Vec<MergeEvent>) {
    let n = drops.len();

    for i in 0..n {
        for j in (i + 1)..n {
            if !drops[i].alive { break; }
            if !drops[j].alive { continue; }

            let (ax, ay) = drops[i].position();
            let (bx, by) = drops[j].position();
            let reach = factor * (drops[i].radius + drops[j].radius);
            let (dx, dy) = (ax - bx, ay - by);
            if dx * dx + dy * dy >= reach * reach { continue; }

            let (big, small) = if drops[i].radius >= drops[j].radius { (i, j) } else { (j, i) };
            let absorbed = drops[small];
            absorb(&mut drops[big], &absorbed);
            drops[small].alive = false;

            let (x, y) = drops[big].position();
            merges.push(MergeEvent { x, y, radius: drops[big].radius });
        }
    }
}

/// Area-preserving merge: `r = sqrt(r1^2 + r2^2)`, momentum conserved by area.
fn absorb(big: &mut Droplet, small: &Droplet) {
    let (a, b) = (big.radius * big.radius, small.radius * small.radius);
    let total = a + b;
    if total <= 0.0 { return; }

    big.vx = (big.vx * a + small.vx * b) / total;
    big.vy = (big.vy * a + small.vy * b) / total;
    big.set_radius(total.sqrt());
}
