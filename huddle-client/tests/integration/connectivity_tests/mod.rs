mod test_connectivity_failure;
mod test_ice_restart;
mod test_remote_tracks;
