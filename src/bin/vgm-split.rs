// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `vgm-split` renders every voice of every track in `in/` to its own WAV file in `out/`.

use vgm_split::decoder::gme::GmeBackend;
use vgm_split::split::{self, SplitError};

fn main() -> Result<(), SplitError> {
    split::split_main(GmeBackend)
}
