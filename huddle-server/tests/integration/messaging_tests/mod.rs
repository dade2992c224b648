mod test_relay_without_target_dropped;
