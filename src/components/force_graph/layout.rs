//! Force simulation over the working copy.
//!
//! Velocity Verlet in the style of d3-force: each tick applies link,
//! many-body, centering and collision forces scaled by `alpha`, then damps
//! velocities and integrates positions. `alpha` decays toward `alpha_target`
//! and the simulation idles once it drops below `alpha_min`.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::model::GraphModel;

/// Tunables of the force simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	pub link_distance: f64,
	pub charge: f64,
	pub alpha_decay: f64,
	pub alpha_min: f64,
	pub velocity_decay: f64,
	/// Gap added to each node's radius for collision.
	pub collide_margin: f64,
	/// Alpha restored by resizes and parameter changes.
	pub reheat_alpha: f64,
	/// Sustained alpha while a node is dragged.
	pub drag_alpha_target: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			link_distance: 100.0,
			charge: -300.0,
			alpha_decay: 0.02,
			alpha_min: 0.001,
			velocity_decay: 0.4,
			collide_margin: 5.0,
			reheat_alpha: 0.3,
			drag_alpha_target: 0.3,
		}
	}
}

const DISTANCE_MIN2: f64 = 1.0;

pub struct LayoutEngine {
	config: LayoutConfig,
	alpha: f64,
	alpha_target: f64,
	center: (f64, f64),
	running: bool,
	rng: SmallRng,
}

impl LayoutEngine {
	pub fn new(config: LayoutConfig, center: (f64, f64), seed: u64) -> Self {
		Self {
			config,
			alpha: 1.0,
			alpha_target: 0.0,
			center,
			running: true,
			rng: SmallRng::seed_from_u64(seed),
		}
	}

	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	pub fn center(&self) -> (f64, f64) {
		self.center
	}

	/// Whether the next [`tick`](Self::tick) will move anything.
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Randomness shared with seeding of new nodes.
	pub fn rng(&mut self) -> &mut SmallRng {
		&mut self.rng
	}

	/// Raise alpha to at least `alpha` and resume ticking.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha);
		self.running = true;
	}

	/// Restart from full energy, for a layout that starts over.
	pub fn restart(&mut self) {
		self.alpha = 1.0;
		self.running = true;
	}

	/// Hold alpha near `target` (non-zero while dragging, zero to let it decay).
	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target;
		if target > 0.0 {
			self.running = true;
		}
	}

	/// Move the centering target and re-settle toward it.
	pub fn set_center(&mut self, center: (f64, f64)) {
		self.center = center;
		self.reheat(self.config.reheat_alpha);
	}

	/// Change link distance and charge. Reheats only when something changed.
	pub fn set_forces(&mut self, link_distance: f64, charge: f64) {
		if self.config.link_distance == link_distance && self.config.charge == charge {
			return;
		}
		self.config.link_distance = link_distance;
		self.config.charge = charge;
		self.reheat(self.config.reheat_alpha);
	}

	/// Stop until the next reheat.
	pub fn stop(&mut self) {
		self.running = false;
	}

	/// Advance one iteration. Returns whether positions were updated.
	pub fn tick(&mut self, model: &mut GraphModel) -> bool {
		if !self.running {
			return false;
		}
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

		self.apply_links(model);
		self.apply_charge(model);
		self.apply_center(model);
		self.apply_collision(model);

		let keep = 1.0 - self.config.velocity_decay;
		for node in model.nodes_mut() {
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= keep;
					node.x += node.vx;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= keep;
					node.y += node.vy;
				}
			}
		}

		if self.alpha < self.config.alpha_min {
			self.running = false;
		}
		true
	}

	fn jiggle(&mut self) -> f64 {
		(self.rng.r#gen::<f64>() - 0.5) * 1e-6
	}

	fn apply_links(&mut self, model: &mut GraphModel) {
		let edges = model.edges().to_vec();
		let counts: Vec<f64> = model
			.nodes()
			.iter()
			.map(|n| n.connections().max(1) as f64)
			.collect();
		let distance = self.config.link_distance;

		for edge in edges {
			if edge.source == edge.target {
				continue;
			}
			let (s, t) = (edge.source, edge.target);
			let strength = 1.0 / counts[s].min(counts[t]);
			let bias = counts[s] / (counts[s] + counts[t]);

			let nodes = model.nodes();
			let mut x = nodes[t].x + nodes[t].vx - nodes[s].x - nodes[s].vx;
			let mut y = nodes[t].y + nodes[t].vy - nodes[s].y - nodes[s].vy;
			if x == 0.0 {
				x = self.jiggle();
			}
			if y == 0.0 {
				y = self.jiggle();
			}
			let len = (x * x + y * y).sqrt();
			let l = (len - distance) / len * self.alpha * strength;
			let (x, y) = (x * l, y * l);

			let nodes = model.nodes_mut();
			nodes[t].vx -= x * bias;
			nodes[t].vy -= y * bias;
			nodes[s].vx += x * (1.0 - bias);
			nodes[s].vy += y * (1.0 - bias);
		}
	}

	fn apply_charge(&mut self, model: &mut GraphModel) {
		let strength = self.config.charge * self.alpha;
		let positions: Vec<(f64, f64)> = model.nodes().iter().map(|n| (n.x, n.y)).collect();
		let n = positions.len();
		let mut impulses = vec![(0.0, 0.0); n];

		for i in 0..n {
			for j in 0..n {
				if i == j {
					continue;
				}
				let mut x = positions[j].0 - positions[i].0;
				let mut y = positions[j].1 - positions[i].1;
				if x == 0.0 {
					x = self.jiggle();
				}
				if y == 0.0 {
					y = self.jiggle();
				}
				let mut l = x * x + y * y;
				if l < DISTANCE_MIN2 {
					l = (DISTANCE_MIN2 * l).sqrt();
				}
				let w = strength / l;
				impulses[i].0 += x * w;
				impulses[i].1 += y * w;
			}
		}

		for (node, (ix, iy)) in model.nodes_mut().iter_mut().zip(impulses) {
			node.vx += ix;
			node.vy += iy;
		}
	}

	fn apply_center(&self, model: &mut GraphModel) {
		let nodes = model.nodes_mut();
		if nodes.is_empty() {
			return;
		}
		let n = nodes.len() as f64;
		let (sx, sy) = nodes
			.iter()
			.fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
		let (dx, dy) = (sx / n - self.center.0, sy / n - self.center.1);
		for node in nodes {
			node.x -= dx;
			node.y -= dy;
		}
	}

	fn apply_collision(&mut self, model: &mut GraphModel) {
		let margin = self.config.collide_margin;
		let radii: Vec<f64> = model.nodes().iter().map(|n| n.radius() + margin).collect();
		let n = radii.len();

		for i in 0..n {
			let (xi, yi) = {
				let a = &model.nodes()[i];
				(a.x + a.vx, a.y + a.vy)
			};
			let ri = radii[i];
			for j in (i + 1)..n {
				let rj = radii[j];
				let r = ri + rj;
				let b = &model.nodes()[j];
				let mut x = xi - b.x - b.vx;
				let mut y = yi - b.y - b.vy;
				let mut l = x * x + y * y;
				if l >= r * r {
					continue;
				}
				if x == 0.0 {
					x = self.jiggle();
					l += x * x;
				}
				if y == 0.0 {
					y = self.jiggle();
					l += y * y;
				}
				let len = l.sqrt();
				let push = (r - len) / len;
				let (x, y) = (x * push, y * push);
				let w = (rj * rj) / (ri * ri + rj * rj);

				let nodes = model.nodes_mut();
				nodes[i].vx += x * w;
				nodes[i].vy += y * w;
				nodes[j].vx -= x * (1.0 - w);
				nodes[j].vy -= y * (1.0 - w);
			}
		}
	}
}
