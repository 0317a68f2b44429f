mod test_malformed_frame_ignored;
mod test_registration_handshake;
mod test_reregistration_releases_room;
