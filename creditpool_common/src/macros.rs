//{{ Liquid }}
//Copyright (C) {{ 2015,2016,2017,2018 }}  {{ Blockstream }}

//This program is free software: you can redistribute it and/or modify
//it under the terms of the GNU Affero General Public License as published by
//the Free Software Foundation, either version 3 of the License, or
//(at your option) any later version.

//This program is distributed in the hope that it will be useful,
//but WITHOUT ANY WARRANTY; without even the implied warranty of
//MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//GNU Affero General Public License for more details.

//You should have received a copy of the GNU Affero General Public License
//along with this program.  If not, see <http://www.gnu.org/licenses/>.

/// Implement consensus encoding for a struct by serializing
/// the listed fields one after another.
#[macro_export]
macro_rules! impl_consensus_encoding {
    ($thing:ident, $($field:ident),+) => {
        impl $crate::bitcoin::consensus::Encodable for $thing {
            fn consensus_encode<W: ::std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, ::std::io::Error> {
                let mut len = 0;
                $(len += $crate::bitcoin::consensus::Encodable::consensus_encode(&self.$field, w)?;)+
                Ok(len)
            }
        }

        impl $crate::bitcoin::consensus::Decodable for $thing {
            fn consensus_decode_from_finite_reader<R: ::std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<$thing, $crate::bitcoin::consensus::encode::Error> {
                Ok($thing {
                    $($field: $crate::bitcoin::consensus::Decodable::consensus_decode_from_finite_reader(r)?),+
                })
            }
        }
    }
}
