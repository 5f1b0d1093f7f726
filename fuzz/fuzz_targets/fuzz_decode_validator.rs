// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![no_main]
#![forbid(unsafe_code)]

use amunchain_modules::core::economics::staking::Validator;
use amunchain_modules::core::types::{decode_canonical_limited, encode_canonical, MAX_RECORD_BYTES};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary store bytes must decode or fail, never panic; a decoded
    // record must re-encode to a stable form.
    if let Ok(v) = decode_canonical_limited::<Validator>(data, MAX_RECORD_BYTES) {
        if let Ok(bytes) = encode_canonical(&v) {
            let again: Validator = match decode_canonical_limited(&bytes, MAX_RECORD_BYTES) {
                Ok(x) => x,
                Err(e) => panic!("re-decode failed: {e}"),
            };
            assert_eq!(again, v);
        }
    }
});
