pub(super) mod battery;
pub(super) mod display;
pub(super) mod layers;
