mod test_pause_resume;
mod test_replace_track;
