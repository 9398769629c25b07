mod export_test;
mod lifecycle_test;
mod params_test;
mod staleness_test;
