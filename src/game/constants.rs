/// Tick timing - the room loop is fixed-step; all simulation time is the
/// room-local clock, never wall time.
pub mod ticking {
    /// Server tick rate in Hz
    pub const TICK_RATE: u32 = 20;
    /// Delta time per tick in seconds
    pub const DT: f64 = 1.0 / 20.0;
    /// Tick duration in milliseconds
    pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;
}

/// Ship hull, shields and movement
pub mod ship {
    /// Hull points at spawn (and the cap)
    pub const MAX_HP: f32 = 100.0;
    /// Shield capacity before seat bonuses
    pub const BASE_MAX_SHIELD: f32 = 50.0;
    /// Shield points regenerated per second at full shield power
    pub const SHIELD_REGEN_RATE: f32 = 6.0;
    /// Thrust acceleration at full engine power
    pub const BASE_ACCEL: f32 = 60.0;
    /// Exponential drag coefficient per second
    pub const DRAG: f32 = 0.8;
    /// Speed ceiling at neutral engine power, before bonuses and boost
    pub const BASE_MAX_SPEED: f32 = 40.0;
    /// Extra ceiling multiplier while the pilot holds boost
    pub const BOOST_MULTIPLIER: f32 = 1.5;
    /// Default sensor radius
    pub const BASE_VISION_RADIUS: f32 = 70.0;
    /// Hull points per second restored inside a hull-regen combo window
    pub const HULL_REGEN_RATE: f32 = 4.0;
    /// Hull restored by one support repair pulse
    pub const REPAIR_AMOUNT: f32 = 8.0;
    /// Seconds between support repair pulses
    pub const REPAIR_COOLDOWN: f64 = 3.0;
    /// Shield restored by one systems shield burst
    pub const SHIELD_BURST_AMOUNT: f32 = 10.0;
    /// Seconds between systems shield bursts
    pub const SHIELD_BURST_COOLDOWN: f64 = 6.0;
}

/// Power-distribution rhythm mechanic
pub mod power {
    /// L1 distance between targets that counts as a significant shift
    pub const SIGNIFICANT_SHIFT: f32 = 0.12;
    /// Perfect-follow-up window opens this long after a shift (seconds)
    pub const WINDOW_OPEN_DELAY: f64 = 0.12;
    /// ...and closes this long after the shift
    pub const WINDOW_CLOSE_DELAY: f64 = 0.5;
    /// Duration of the perfect-shift performance buff
    pub const PERFECT_BUFF_DURATION: f64 = 2.0;
    /// Instability/heat multiplier applied on a perfect follow-up
    pub const PERFECT_RELIEF: f32 = 0.45;
    /// Instability gained per unit of missed shift magnitude
    pub const MISS_INSTABILITY_GAIN: f32 = 0.6;
    /// Heat gained per unit of missed shift magnitude
    pub const MISS_HEAT_GAIN: f32 = 0.5;
    /// Exponential decay rate of instability and heat (per second)
    pub const DECAY_RATE: f32 = 0.35;
    /// Instability or heat above this triggers an overload
    pub const OVERLOAD_THRESHOLD: f32 = 1.0;
    /// Effective power clamp while overloaded
    pub const OVERLOAD_CLAMP: f32 = 0.55;
    /// Base rate at which actual energy eases toward the target
    pub const EASE_RATE: f32 = 4.0;
}

/// Seat rotation scheduler
pub mod swap {
    /// Idle timer is re-rolled uniformly in [IDLE_MIN, IDLE_MAX) seconds
    pub const IDLE_MIN: f64 = 45.0;
    pub const IDLE_MAX: f64 = 90.0;
    /// Fixed warning countdown before a swap
    pub const WARNING_DURATION: f64 = 3.0;
    /// Fixed post-swap reorientation window
    pub const GRACE_DURATION: f64 = 2.0;
    /// Swaps are deferred while ship speed exceeds this
    pub const SAFE_SPEED: f32 = 55.0;
    /// Attempt budget for a no-fixed-point seat permutation
    pub const PERMUTATION_ATTEMPTS: u32 = 12;
    /// Incoming damage multiplier during warning and grace
    pub const DAMAGE_REDUCTION: f32 = 0.5;
    /// Seconds a disconnected session's seat is reserved before bot takeover
    pub const RECONNECT_GRACE: f64 = 30.0;
}

/// Enemy spawning and behavior
pub mod enemies {
    /// Spawn interval at wave 1
    pub const BASE_SPAWN_INTERVAL: f64 = 6.0;
    /// Interval reduction per wave
    pub const SPAWN_INTERVAL_DECAY: f64 = 0.25;
    /// Interval floor
    pub const MIN_SPAWN_INTERVAL: f64 = 1.5;
    /// Spawn count is min(BASE_SPAWN_COUNT + wave, SPAWN_CAP)
    pub const BASE_SPAWN_COUNT: u32 = 4;
    pub const SPAWN_CAP: u32 = 24;
    /// Spawn ring distance band around the ship
    pub const SPAWN_RING_MIN: f32 = 40.0;
    pub const SPAWN_RING_MAX: f32 = 70.0;
    /// Every Nth wave carries a boss
    pub const BOSS_WAVE_EVERY: u32 = 5;
    /// Range at which a boss arms its telegraph
    pub const BOSS_RANGE: f32 = 60.0;
    /// Telegraph duration before the volley may fire
    pub const TELEGRAPH_DURATION: f64 = 1.2;
    /// Projectiles per boss volley
    pub const VOLLEY_COUNT: u32 = 6;
    /// Seconds between boss volleys (telegraph included)
    pub const VOLLEY_COOLDOWN: f64 = 4.0;
    /// Angular spread of a volley in radians
    pub const VOLLEY_SPREAD: f32 = 0.5;
    /// Spitter firing range
    pub const SPITTER_RANGE: f32 = 45.0;
    /// Enemy projectile speed
    pub const PROJECTILE_SPEED: f32 = 55.0;
    /// Enemy projectile lifetime in seconds
    pub const PROJECTILE_LIFETIME: f64 = 4.0;
    /// Distance at which a projectile hits the ship
    pub const PROJECTILE_HIT_RADIUS: f32 = 3.0;
    /// Distance at which an enemy deals contact damage
    pub const CONTACT_RADIUS: f32 = 3.5;
    /// Per-wave multiplier on enemy speed
    pub const WAVE_SPEED_SCALE: f32 = 0.03;
    /// Support scan marks enemies for this long
    pub const MARK_DURATION: f64 = 6.0;
    /// Seconds between support scans
    pub const SCAN_COOLDOWN: f64 = 5.0;
}

/// Ship-side combat
pub mod combat {
    /// Fixed damage per wall contact
    pub const WALL_DAMAGE: f32 = 5.0;
    /// Minimum seconds between wall-contact damage applications
    pub const WALL_HIT_COOLDOWN: f64 = 0.4;
    /// Velocity retained after a wall bounce
    pub const WALL_BOUNCE_DAMPING: f32 = 0.45;
    /// Gunner hit-scan range
    pub const GUN_RANGE: f32 = 80.0;
    /// Damage multiplier inside a damage-surge combo window
    pub const SURGE_DAMAGE_MULT: f32 = 1.5;
    /// Cooldown multiplier inside an overclock combo window
    pub const OVERCLOCK_COOLDOWN_MULT: f32 = 0.6;
}

/// Upgrade offer cadence
pub mod upgrades {
    /// Seconds between upgrade offers
    pub const OFFER_INTERVAL: f64 = 45.0;
    /// Options per offer
    pub const CHOICE_COUNT: usize = 3;
}

/// Cave path generation
pub mod cave {
    /// Control nodes per generated path
    pub const NODE_COUNT: usize = 64;
}

/// Network limits
pub mod net {
    /// Maximum framed message size in bytes
    pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;
    /// Input channel capacity per room
    pub const INPUT_CHANNEL_CAPACITY: usize = 256;
}
