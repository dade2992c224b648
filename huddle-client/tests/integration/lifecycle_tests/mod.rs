mod test_toggle_tracks;
