//! Geometric Brownian motion with rare multiplicative jumps.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::{PriceConfig, PriceState};

#[derive(Debug, Clone, PartialEq)]
pub struct GbmParams {
    pub drift: f64,
    pub volatility: f64,
    /// Seconds per tick.
    pub dt: f64,
    pub min_price: f64,
    pub jump_probability: f64,
    pub jump_min_pct: f64,
    pub jump_max_pct: f64,
}

impl GbmParams {
    pub fn from_config(cfg: &PriceConfig) -> Self {
        let (lo, hi) = if cfg.jump_min_pct <= cfg.jump_max_pct {
            (cfg.jump_min_pct, cfg.jump_max_pct)
        } else {
            (cfg.jump_max_pct, cfg.jump_min_pct)
        };
        Self {
            drift: cfg.drift,
            volatility: cfg.volatility.max(0.0),
            dt: cfg.tick_dt.max(0.0),
            min_price: if cfg.min_price > 0.0 { cfg.min_price } else { 1.0 },
            jump_probability: cfg.jump_probability.clamp(0.0, 1.0),
            jump_min_pct: lo.max(0.0),
            jump_max_pct: hi.max(0.0),
        }
    }
}

pub struct GbmSimulator {
    params: GbmParams,
    rng: StdRng,
    state: PriceState,
}

/// One simulated step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimTick {
    pub state: PriceState,
    pub jumped: bool,
}

impl GbmSimulator {
    pub fn new(params: GbmParams, initial_price: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let p0 = if initial_price.is_finite() {
            initial_price.max(params.min_price)
        } else {
            params.min_price
        };
        Self {
            params,
            rng,
            state: PriceState::flat(p0),
        }
    }

    pub fn state(&self) -> PriceState {
        self.state
    }

    pub fn tick(&mut self) -> SimTick {
        let p = &self.params;
        let s = self.state.current;

        let z: f64 = self.rng.sample(StandardNormal);
        let drift = (p.drift - 0.5 * p.volatility * p.volatility) * p.dt;
        let shock = p.volatility * p.dt.sqrt() * z;
        let mut next = s * (drift + shock).exp();

        let jumped = p.jump_probability > 0.0 && self.rng.random_bool(p.jump_probability);
        if jumped {
            let pct = if p.jump_max_pct > p.jump_min_pct {
                self.rng.random_range(p.jump_min_pct..=p.jump_max_pct)
            } else {
                p.jump_min_pct
            };
            let sign = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
            next *= 1.0 + sign * pct / 100.0;
        }

        if !next.is_finite() {
            next = s;
        }
        let next = next.max(p.min_price);

        self.state = PriceState {
            current: next,
            previous: s,
        };
        SimTick {
            state: self.state,
            jumped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GbmParams {
        GbmParams::from_config(&PriceConfig::default())
    }

    #[test]
    fn test_same_seed_same_path() {
        let mut a = GbmSimulator::new(params(), 1100.0, Some(7));
        let mut b = GbmSimulator::new(params(), 1100.0, Some(7));
        for _ in 0..500 {
            assert_eq!(a.tick(), b.tick());
        }
        let mut c = GbmSimulator::new(params(), 1100.0, Some(8));
        let diverged = (0..50).any(|_| c.tick().state != a.tick().state);
        assert!(diverged);
    }

    #[test]
    fn test_previous_tracks_prior_tick() {
        let mut sim = GbmSimulator::new(params(), 1100.0, Some(1));
        let first = sim.tick().state;
        assert_eq!(first.previous, 1100.0);
        let second = sim.tick().state;
        assert_eq!(second.previous, first.current);
    }

    #[test]
    fn test_floor_holds_under_violent_volatility() {
        let p = GbmParams {
            volatility: 3.0,
            drift: -2.0,
            dt: 1.0,
            jump_probability: 0.5,
            ..params()
        };
        for seed in 0..20 {
            let mut sim = GbmSimulator::new(p.clone(), 2.0, Some(seed));
            for _ in 0..200 {
                let px = sim.tick().state.current;
                assert!(px >= 1.0, "seed {seed} produced {px}");
            }
        }
    }

    #[test]
    fn test_jump_magnitude_bounds() {
        // No diffusion: every move is a jump.
        let p = GbmParams {
            volatility: 0.0,
            drift: 0.0,
            jump_probability: 1.0,
            ..params()
        };
        let mut sim = GbmSimulator::new(p, 1000.0, Some(3));
        for _ in 0..100 {
            let t = sim.tick();
            assert!(t.jumped);
            let pct = ((t.state.current / t.state.previous) - 1.0).abs() * 100.0;
            assert!((0.6 - 1e-9..=2.5 + 1e-9).contains(&pct), "jump {pct}%");
        }
    }
}
