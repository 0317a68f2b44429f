mod test_health_endpoint;
mod test_unknown_target_dropped;
