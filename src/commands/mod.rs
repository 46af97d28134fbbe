// Declaration overview
pub mod info;

// Queue and compute environment lifecycle
pub mod lifecycle;

// Jobs and job definitions
pub mod job;

// Whole-declaration reconciliation
pub mod reconcile;
